//! Diagram renderers: UML text in, SVG out.
//!
//! - [`BuiltinSvgRenderer`] lays the model out itself, no external tools
//! - [`PlantUmlRenderer`] pipes the UML text through a `plantuml` binary

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use tuguml_core::model::{Component, ComponentId, SourceComponent};
use tuguml_core::visitor::{RelationExtractor, RelationKind, UmlExtractor, UmlOptions};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("renderer timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("renderer exited with {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".to_string()))]
    Failed { code: Option<i32>, stderr: String },

    #[error("renderer produced no SVG output")]
    EmptyOutput,

    #[error("renderer I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDiagram {
    /// Name of the renderer that produced it.
    pub renderer: String,
    pub media_type: String,
    pub content: String,
}

impl RenderedDiagram {
    pub fn svg(renderer: impl Into<String>, content: impl Into<String>) -> Self {
        RenderedDiagram {
            renderer: renderer.into(),
            media_type: "image/svg+xml".to_string(),
            content: content.into(),
        }
    }
}

/// Turns UML text and its model into an image.
pub trait DiagramRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render(
        &self,
        uml: &str,
        tree: &SourceComponent,
        options: UmlOptions,
    ) -> Result<RenderedDiagram, RenderError>;
}

// ============================================================================
// Builtin SVG
// ============================================================================

const CHAR_WIDTH: f64 = 7.2;
const LINE_HEIGHT: f64 = 16.0;
const PADDING: f64 = 8.0;
const GAP: f64 = 48.0;
const MARGIN: f64 = 20.0;

/// Escape text for XML content and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// One box on the grid.
#[derive(Debug)]
struct Shape {
    id: ComponentId,
    /// Stereotype line (`«interface»`), if any.
    stereotype: Option<&'static str>,
    title: String,
    members: Vec<String>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Shape {
    fn new(component: Component<'_>, uml: &mut UmlExtractor) -> Self {
        let (stereotype, title) = match component {
            Component::ClassOrInterface(h) if h.is_interface => (Some("«interface»"), component.qualified_name()),
            Component::ClassOrInterface(h) if h.modifiers.is_abstract => {
                (Some("«abstract»"), component.qualified_name())
            }
            Component::Enum(_) => (Some("«enum»"), component.qualified_name()),
            Component::External(_) => (Some("«external»"), component.qualified_name()),
            _ => (None, component.qualified_name()),
        };
        let members: Vec<String> = component
            .children()
            .into_iter()
            .filter(|c| c.is_leaf())
            .map(|c| c.accept(uml))
            .collect();

        let widest = std::iter::once(title.chars().count())
            .chain(stereotype.map(|s| s.chars().count()))
            .chain(members.iter().map(|m| m.chars().count()))
            .max()
            .unwrap_or(0);
        let header_lines = if stereotype.is_some() { 2.0 } else { 1.0 };
        let width = (widest as f64 * CHAR_WIDTH + 2.0 * PADDING).max(80.0);
        let height =
            (header_lines + members.len() as f64) * LINE_HEIGHT + 3.0 * PADDING;

        Shape {
            id: component.id(),
            stereotype,
            title,
            members,
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point where the ray from the center towards `(tx, ty)` leaves the box.
    fn border_towards(&self, tx: f64, ty: f64) -> (f64, f64) {
        let (cx, cy) = self.center();
        let (dx, dy) = (tx - cx, ty - cy);
        if dx == 0.0 && dy == 0.0 {
            return (cx, cy);
        }
        let sx = if dx == 0.0 { f64::INFINITY } else { (self.width / 2.0) / dx.abs() };
        let sy = if dy == 0.0 { f64::INFINITY } else { (self.height / 2.0) / dy.abs() };
        let t = sx.min(sy);
        (cx + dx * t, cy + dy * t)
    }

    fn write_svg(&self, out: &mut String) {
        let _ = writeln!(
            out,
            r#"<g class="type" id="{}"><rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="3"/>"#,
            self.id, self.x, self.y, self.width, self.height
        );
        let cx = self.x + self.width / 2.0;
        let mut y = self.y + PADDING + LINE_HEIGHT - 4.0;
        if let Some(stereotype) = self.stereotype {
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" class="stereotype">{}</text>"#,
                cx,
                y,
                xml_escape(stereotype)
            );
            y += LINE_HEIGHT;
        }
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" class="title">{}</text>"#,
            cx,
            y,
            xml_escape(&self.title)
        );
        let rule = y + PADDING;
        let _ = writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}"/>"#,
            self.x,
            rule,
            self.x + self.width,
            rule
        );
        let mut y = rule + LINE_HEIGHT;
        for member in &self.members {
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" class="member">{}</text>"#,
                self.x + PADDING,
                y,
                xml_escape(member)
            );
            y += LINE_HEIGHT;
        }
        out.push_str("</g>\n");
    }
}

/// Renders the model as a grid of boxes joined by UML arrows.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSvgRenderer;

impl BuiltinSvgRenderer {
    pub fn new() -> Self {
        BuiltinSvgRenderer
    }

    /// Place shapes row by row on a roughly square grid.
    fn layout(shapes: &mut [Shape]) -> (f64, f64) {
        if shapes.is_empty() {
            return (2.0 * MARGIN, 2.0 * MARGIN);
        }
        let columns = (shapes.len() as f64).sqrt().ceil() as usize;
        let rows = shapes.len().div_ceil(columns);
        let mut col_width = vec![0.0f64; columns];
        let mut row_height = vec![0.0f64; rows];
        for (i, shape) in shapes.iter().enumerate() {
            col_width[i % columns] = col_width[i % columns].max(shape.width);
            row_height[i / columns] = row_height[i / columns].max(shape.height);
        }
        for (i, shape) in shapes.iter_mut().enumerate() {
            let (col, row) = (i % columns, i / columns);
            shape.x = MARGIN + col_width[..col].iter().map(|w| w + GAP).sum::<f64>();
            shape.y = MARGIN + row_height[..row].iter().map(|h| h + GAP).sum::<f64>();
        }
        let width = 2.0 * MARGIN + col_width.iter().sum::<f64>() + GAP * (columns - 1) as f64;
        let height = 2.0 * MARGIN + row_height.iter().sum::<f64>() + GAP * (rows - 1) as f64;
        (width, height)
    }
}

fn edge_style(kind: RelationKind) -> (&'static str, bool, bool) {
    // (marker, dashed, marker at the source end)
    match kind {
        RelationKind::Generalization => ("triangle", false, false),
        RelationKind::Realization => ("triangle", true, false),
        RelationKind::Association => ("arrow", false, false),
        RelationKind::Dependency | RelationKind::Usage => ("arrow", true, false),
        RelationKind::Nesting => ("nest", false, true),
    }
}

const SVG_DEFS: &str = r#"<defs>
<marker id="triangle" viewBox="0 0 12 12" refX="12" refY="6" markerWidth="12" markerHeight="12" orient="auto-start-reverse"><path d="M0,0 L12,6 L0,12 z" fill="white" stroke="black"/></marker>
<marker id="arrow" viewBox="0 0 12 12" refX="12" refY="6" markerWidth="10" markerHeight="10" orient="auto-start-reverse"><path d="M0,0 L12,6 L0,12" fill="none" stroke="black"/></marker>
<marker id="nest" viewBox="0 0 12 12" refX="0" refY="6" markerWidth="12" markerHeight="12" orient="auto-start-reverse"><circle cx="6" cy="6" r="5" fill="white" stroke="black"/><path d="M1,6 L11,6 M6,1 L6,11" stroke="black"/></marker>
</defs>
<style>rect{fill:#fefece;stroke:#a80036}line,path.edge{stroke:#a80036}text{font-family:monospace;font-size:12px}.title{font-weight:bold}.stereotype{font-style:italic}</style>
"#;

impl DiagramRenderer for BuiltinSvgRenderer {
    fn name(&self) -> &str {
        "builtin"
    }

    fn render(
        &self,
        _uml: &str,
        tree: &SourceComponent,
        options: UmlOptions,
    ) -> Result<RenderedDiagram, RenderError> {
        let mut extractor = UmlExtractor::with_options(options);
        let mut shapes: Vec<Shape> = tree
            .types()
            .into_iter()
            .map(|c| Shape::new(c, &mut extractor))
            .collect();
        if options.include_externals {
            for ext in tree.external_components() {
                shapes.push(Shape::new(Component::External(ext), &mut extractor));
            }
        }
        let (width, height) = BuiltinSvgRenderer::layout(&mut shapes);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
            width, height, width, height
        );
        if !tree.name().is_empty() {
            let _ = writeln!(svg, "<title>{}</title>", xml_escape(tree.name()));
        }
        svg.push_str(SVG_DEFS);

        let position = |id: ComponentId| shapes.iter().position(|s| s.id == id);
        let mut edges = 0;
        for relation in RelationExtractor::extract(tree) {
            let (Some(from), Some(to)) = (position(relation.from), position(relation.to)) else {
                continue;
            };
            if from == to {
                continue;
            }
            let (marker, dashed, at_start) = edge_style(relation.kind);
            let (tx, ty) = shapes[to].center();
            let (fx, fy) = shapes[from].center();
            let (x1, y1) = shapes[from].border_towards(tx, ty);
            let (x2, y2) = shapes[to].border_towards(fx, fy);
            let dash = if dashed { r#" stroke-dasharray="6,4""# } else { "" };
            let marker_attr = if at_start { "marker-start" } else { "marker-end" };
            let _ = writeln!(
                svg,
                r#"<path class="edge {}" d="M{:.1},{:.1} L{:.1},{:.1}" fill="none"{} {}="url(#{})"/>"#,
                relation.kind.name(),
                x1,
                y1,
                x2,
                y2,
                dash,
                marker_attr,
                marker
            );
            edges += 1;
        }
        for shape in &shapes {
            shape.write_svg(&mut svg);
        }
        svg.push_str("</svg>\n");

        debug!(boxes = shapes.len(), edges, "rendered builtin SVG");
        Ok(RenderedDiagram::svg(self.name(), svg))
    }
}

// ============================================================================
// PlantUML
// ============================================================================

/// Runs `plantuml -tsvg -pipe` with the UML text on stdin.
#[derive(Debug, Clone)]
pub struct PlantUmlRenderer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl PlantUmlRenderer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        PlantUmlRenderer {
            program: program.into(),
            args: vec!["-tsvg".to_string(), "-pipe".to_string(), "-charset".to_string(), "UTF-8".to_string()],
            timeout: PlantUmlRenderer::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl DiagramRenderer for PlantUmlRenderer {
    fn name(&self) -> &str {
        "plantuml"
    }

    fn render(
        &self,
        uml: &str,
        _tree: &SourceComponent,
        _options: UmlOptions,
    ) -> Result<RenderedDiagram, RenderError> {
        // Files instead of pipes: the child can never block on a full pipe
        // while we wait on it.
        let mut input = tempfile::tempfile()?;
        input.write_all(uml.as_bytes())?;
        input.seek(SeekFrom::Start(0))?;
        let mut output = tempfile::tempfile()?;
        let mut errors = tempfile::tempfile()?;

        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output.try_clone()?))
            .stderr(Stdio::from(errors.try_clone()?))
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(program = %self.program.display(), timeout = ?self.timeout, "renderer timed out");
                return Err(RenderError::Timeout {
                    timeout: self.timeout,
                });
            }
        };
        debug!(elapsed = ?start.elapsed(), status = ?status.code(), "plantuml finished");

        if !status.success() {
            let stderr = read_all(&mut errors)?;
            return Err(RenderError::Failed {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let content = read_all(&mut output)?;
        if content.trim().is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(RenderedDiagram::svg(self.name(), content))
    }
}

fn read_all(file: &mut fs::File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    io::Read::read_to_end(file, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuguml_core::declaration::{
        DeclarationKind, ResolvedField, ResolvedMethod, ResolvedType, ResolvedTypeDeclaration,
        Visibility,
    };

    fn tree() -> SourceComponent {
        let mut shape = ResolvedTypeDeclaration::new(DeclarationKind::Interface, "g", "Shape");
        shape.type_parameters.push("T".to_string());
        shape.methods.push(ResolvedMethod::new(
            "area",
            Visibility::Public,
            ResolvedType::primitive("double"),
        ));
        let mut circle = ResolvedTypeDeclaration::new(DeclarationKind::Class, "g", "Circle");
        circle.implements.push(ResolvedType::project("g.Shape"));
        circle.fields.push(ResolvedField::new(
            "label",
            Visibility::Private,
            ResolvedType::external("java.lang.String", "java.lang"),
        ));
        SourceComponent::build("geo & co", vec![shape, circle])
    }

    mod builtin_tests {
        use super::*;

        #[test]
        fn escapes_markup() {
            assert_eq!(xml_escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
        }

        #[test]
        fn draws_boxes_members_and_edges() {
            let tree = tree();
            let uml = UmlExtractor::generate(&tree, UmlOptions::default());
            let svg = BuiltinSvgRenderer::new()
                .render(&uml, &tree, UmlOptions::default())
                .unwrap();
            assert_eq!(svg.renderer, "builtin");
            assert_eq!(svg.media_type, "image/svg+xml");
            let content = &svg.content;
            assert!(content.starts_with("<svg"));
            assert!(content.trim_end().ends_with("</svg>"));
            assert!(content.contains("<title>geo &amp; co</title>"));
            assert!(content.contains(">g.Circle</text>"));
            assert!(content.contains("+ double area()"));
            assert!(content.contains("- String label"));
            assert_eq!(content.matches(r#"class="type""#).count(), 3);
            assert!(content.contains(r#"class="edge realization""#));
            assert!(content.contains(r#"class="edge usage""#));
        }

        #[test]
        fn externals_can_be_left_out() {
            let tree = tree();
            let options = UmlOptions {
                include_externals: false,
            };
            let svg = BuiltinSvgRenderer::new().render("", &tree, options).unwrap();
            assert_eq!(svg.content.matches(r#"class="type""#).count(), 2);
            assert!(!svg.content.contains("«external»"));
            assert!(!svg.content.contains("edge usage"));
        }

        #[test]
        fn empty_tree_still_renders() {
            let tree = SourceComponent::build("", Vec::new());
            let svg = BuiltinSvgRenderer::new()
                .render("", &tree, UmlOptions::default())
                .unwrap();
            assert!(svg.content.contains("</svg>"));
        }

        #[test]
        fn border_point_lies_on_box_edge() {
            let tree = tree();
            let mut uml = UmlExtractor::new();
            let mut shape = Shape::new(tree.types()[0], &mut uml);
            shape.x = 0.0;
            shape.y = 0.0;
            shape.width = 100.0;
            shape.height = 50.0;
            let close = |(x, y): (f64, f64), (ex, ey): (f64, f64)| {
                (x - ex).abs() < 1e-9 && (y - ey).abs() < 1e-9
            };
            assert!(close(shape.border_towards(500.0, 25.0), (100.0, 25.0)));
            assert!(close(shape.border_towards(50.0, -300.0), (50.0, 0.0)));
        }
    }

    #[cfg(unix)]
    mod plantuml_tests {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-plantuml");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn pipes_uml_through_program() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "printf '<svg>'; cat; printf '</svg>'");
            let tree = tree();
            let out = PlantUmlRenderer::new(program)
                .render("@startuml\n@enduml\n", &tree, UmlOptions::default())
                .unwrap();
            assert_eq!(out.renderer, "plantuml");
            assert_eq!(out.content, "<svg>@startuml\n@enduml\n</svg>");
        }

        #[test]
        fn nonzero_exit_is_failure_with_stderr() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "echo 'syntax error' >&2; exit 3");
            let err = PlantUmlRenderer::new(program)
                .render("x", &tree(), UmlOptions::default())
                .unwrap_err();
            match err {
                RenderError::Failed { code, stderr } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "syntax error");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn slow_renderer_times_out() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "sleep 10");
            let started = Instant::now();
            let err = PlantUmlRenderer::new(program)
                .with_timeout(Duration::from_millis(200))
                .render("x", &tree(), UmlOptions::default())
                .unwrap_err();
            assert!(matches!(err, RenderError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn missing_program_is_spawn_error() {
            let dir = TempDir::new().unwrap();
            let err = PlantUmlRenderer::new(dir.path().join("absent"))
                .render("x", &tree(), UmlOptions::default())
                .unwrap_err();
            assert!(matches!(err, RenderError::Spawn { .. }));
        }

        #[test]
        fn empty_output_is_rejected() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "cat > /dev/null");
            let err = PlantUmlRenderer::new(program)
                .render("x", &tree(), UmlOptions::default())
                .unwrap_err();
            assert!(matches!(err, RenderError::EmptyOutput));
        }
    }
}
