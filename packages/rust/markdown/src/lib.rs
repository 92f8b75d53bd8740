//! Markdown rendering of compounds through Handlebars templates.
//!
//! A [`Renderer`] is built once per run from [`RenderOptions`]; it owns its
//! template registry and helpers, so nothing is registered globally.
//! Templates receive a serialized [`CompoundView`] plus a `heading` field.

use std::path::{Path, PathBuf};

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, no_escape,
};
use tracing::{debug, instrument};

use doxymark_shared::{CompoundView, DoxymarkError, Result};

/// Templates every template set must provide.
pub const REQUIRED_TEMPLATES: [&str; 3] = ["namespace", "class", "group"];

const CPP_NAMESPACE: &str = include_str!("../templates/cpp/namespace.md");
const CPP_CLASS: &str = include_str!("../templates/cpp/class.md");
const CPP_GROUP: &str = include_str!("../templates/cpp/group.md");

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for building a [`Renderer`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Template language of the embedded set (only `cpp` ships).
    pub lang: String,
    /// Emit `{#refid}` anchors after headings.
    pub anchors: bool,
    /// Directory of `<name>.md` templates replacing the embedded set.
    pub template_dir: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            lang: "cpp".into(),
            anchors: true,
            template_dir: None,
        }
    }
}

/// Template-driven compound renderer.
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("templates", &self.handlebars.get_templates().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

impl Renderer {
    /// Register helpers and load the template set.
    pub fn new(opts: &RenderOptions) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(no_escape);

        handlebars.register_helper("cell", Box::new(cell_helper));
        handlebars.register_helper("title", Box::new(title_helper));
        let anchors = opts.anchors;
        handlebars.register_helper(
            "anchor",
            Box::new(
                move |h: &Helper,
                      _: &Handlebars,
                      _: &Context,
                      _: &mut RenderContext,
                      out: &mut dyn Output|
                      -> HelperResult {
                    if anchors {
                        let name = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
                        out.write(&anchor(name))?;
                    }
                    Ok(())
                },
            ),
        );

        match &opts.template_dir {
            Some(dir) => load_template_dir(&mut handlebars, dir)?,
            None => load_embedded(&mut handlebars, &opts.lang)?,
        }

        for name in REQUIRED_TEMPLATES {
            if !handlebars.has_template(name) {
                return Err(DoxymarkError::Render(format!("missing template '{name}'")));
            }
        }

        Ok(Self { handlebars })
    }

    /// Render one compound, or `None` when no template applies to it.
    ///
    /// Pass-through namespaces (a single nested namespace and nothing else)
    /// and kinds without a template produce `None`.
    #[instrument(skip_all, fields(kind = %view.kind, name = %view.name))]
    pub fn render(&self, view: &CompoundView) -> Result<Option<String>> {
        let template = match view.kind.as_str() {
            "namespace" if view.pass_through => {
                debug!("pass-through namespace, nothing to render");
                return Ok(None);
            }
            "namespace" => "namespace",
            "group" => "group",
            "class" | "struct" => "class",
            _ => return Ok(None),
        };

        debug!(template, "rendering compound");

        let mut data = serde_json::to_value(view)
            .map_err(|e| DoxymarkError::Render(format!("cannot serialize {}: {e}", view.name)))?;
        if let Some(object) = data.as_object_mut() {
            let heading = view.extra.get("title").unwrap_or(&view.name).clone();
            object.insert("heading".into(), serde_json::Value::String(heading));
        }

        self.handlebars
            .render(template, &data)
            .map(Some)
            .map_err(|e| DoxymarkError::Render(format!("{} '{}': {e}", view.kind, view.name)))
    }
}

// ---------------------------------------------------------------------------
// Template loading
// ---------------------------------------------------------------------------

fn load_embedded(handlebars: &mut Handlebars<'static>, lang: &str) -> Result<()> {
    let templates = match lang {
        "cpp" => [
            ("namespace", CPP_NAMESPACE),
            ("class", CPP_CLASS),
            ("group", CPP_GROUP),
        ],
        other => {
            return Err(DoxymarkError::config(format!(
                "no embedded templates for language '{other}', set output.template_dir"
            )));
        }
    };

    for (name, source) in templates {
        register(handlebars, name, source)?;
    }
    Ok(())
}

/// Register every `*.md` file in `dir` under its file stem.
fn load_template_dir(handlebars: &mut Handlebars<'static>, dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| DoxymarkError::io(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| DoxymarkError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = std::fs::read_to_string(&path).map_err(|e| DoxymarkError::io(&path, e))?;
        register(handlebars, name, &source)?;
        debug!(template = name, path = %path.display(), "loaded template");
    }
    Ok(())
}

fn register(handlebars: &mut Handlebars<'static>, name: &str, source: &str) -> Result<()> {
    handlebars
        .register_template_string(name, source)
        .map_err(|e| DoxymarkError::Render(format!("template '{name}': {e}")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape text for a Markdown table cell.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br/>")
}

/// Keep a heading on one line.
pub fn escape_title(text: &str) -> String {
    text.replace('\n', "<br/>")
}

/// Heading anchor for internal links.
pub fn anchor(name: &str) -> String {
    format!("{{#{name}}}")
}

fn cell_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&escape_cell(param))?;
    Ok(())
}

fn title_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&escape_title(param))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use doxymark_shared::{BaseRef, ChildView, MemberRecord};

    fn view(kind: &str, name: &str) -> CompoundView {
        CompoundView {
            kind: kind.into(),
            name: name.into(),
            refid: format!("{kind}_{}", name.replace("::", "_1_1")),
            brief: String::new(),
            detailed: String::new(),
            pass_through: false,
            base_refs: vec![],
            members: vec![],
            children: vec![],
            extra: BTreeMap::new(),
        }
    }

    fn method(name: &str, args: &str, brief: &str) -> MemberRecord {
        MemberRecord {
            refid: format!("m_{name}"),
            kind: "function".into(),
            section: "public-func".into(),
            name: name.into(),
            definition: format!("void {name}"),
            argsstring: args.into(),
            brief: brief.into(),
            ..Default::default()
        }
    }

    #[test]
    fn helpers_escape_markdown() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b<br/>c");
        assert_eq!(escape_title("x\ny"), "x<br/>y");
        assert_eq!(anchor("classFoo"), "{#classFoo}");
    }

    #[test]
    fn renders_class_members_in_given_order() {
        let renderer = Renderer::new(&RenderOptions::default()).unwrap();
        let mut class = view("class", "net::Socket");
        class.brief = "A TCP socket.".into();
        class.base_refs.push(BaseRef {
            name: "Stream".into(),
            refid: None,
            prot: "public".into(),
            virt: "non-virtual".into(),
        });
        class.members = vec![
            method("open", "(int port)", "Open it."),
            method("close", "()", "Close | release."),
        ];

        let text = renderer.render(&class).unwrap().unwrap();
        assert!(text.contains("# class `net::Socket` {#class_net_1_1Socket}"));
        assert!(text.contains("public Stream"));
        assert!(text.contains("A TCP socket."));
        assert!(text.contains("Close \\| release."));
        let open = text.find("#### `void open(int port)`").unwrap();
        let close = text.find("#### `void close()`").unwrap();
        assert!(open < close);
    }

    #[test]
    fn anchors_can_be_disabled() {
        let opts = RenderOptions {
            anchors: false,
            ..RenderOptions::default()
        };
        let renderer = Renderer::new(&opts).unwrap();
        let text = renderer.render(&view("struct", "Point")).unwrap().unwrap();
        assert!(text.contains("# struct `Point`"));
        assert!(!text.contains("{#"));
    }

    #[test]
    fn group_heading_prefers_title() {
        let renderer = Renderer::new(&RenderOptions::default()).unwrap();
        let mut group = view("group", "io");
        group.extra.insert("title".into(), "Input / Output".into());
        group.children.push(ChildView {
            kind: "class".into(),
            name: "net::Socket".into(),
            refid: "classnet_1_1Socket".into(),
            brief: "A TCP socket.".into(),
        });

        let text = renderer.render(&group).unwrap().unwrap();
        assert!(text.contains("# group `Input / Output`"));
        assert!(text.contains("[`net::Socket`](#classnet_1_1Socket)"));
    }

    #[test]
    fn not_applicable_kinds_render_nothing() {
        let renderer = Renderer::new(&RenderOptions::default()).unwrap();
        let mut ns = view("namespace", "outer");
        ns.pass_through = true;
        assert!(renderer.render(&ns).unwrap().is_none());
        assert!(renderer.render(&view("union", "U")).unwrap().is_none());
        assert!(renderer.render(&view("typedef", "T")).unwrap().is_none());
    }

    #[test]
    fn unknown_language_is_a_config_error() {
        let opts = RenderOptions {
            lang: "cobol".into(),
            ..RenderOptions::default()
        };
        let err = Renderer::new(&opts).unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn template_dir_overrides_embedded_set() {
        let dir = std::env::temp_dir().join(format!("doxymark-templates-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("namespace.md"), "NS {{name}}\n").unwrap();
        std::fs::write(dir.join("class.md"), "CLASS {{name}}:{{#each members}} {{name}}{{/each}}\n").unwrap();
        std::fs::write(dir.join("group.md"), "GROUP {{heading}}\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let opts = RenderOptions {
            template_dir: Some(dir.clone()),
            ..RenderOptions::default()
        };
        let renderer = Renderer::new(&opts).unwrap();
        let mut class = view("class", "K");
        class.members = vec![method("a", "()", ""), method("b", "()", "")];
        assert_eq!(renderer.render(&class).unwrap().unwrap(), "CLASS K: a b\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn template_dir_must_be_complete() {
        let dir = std::env::temp_dir().join(format!("doxymark-templates-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("class.md"), "{{name}}").unwrap();

        let opts = RenderOptions {
            template_dir: Some(dir.clone()),
            ..RenderOptions::default()
        };
        let err = Renderer::new(&opts).unwrap_err();
        assert!(err.to_string().contains("missing template"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
