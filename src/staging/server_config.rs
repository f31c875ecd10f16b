// ABOUTME: Reads and rewrites the layer list of a server-config.xml descriptor.
// ABOUTME: The document shape is <server-config><layers><layer>name</layer>...</layers></server-config>.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

const ROOT: &str = "server-config";
const LAYERS: &str = "layers";
const LAYER: &str = "layer";

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unknown element <{0}>")]
    UnknownElement(String),

    #[error("unexpected attribute on <{0}>")]
    UnexpectedAttribute(String),

    #[error("duplicate <{0}> element")]
    Duplicate(String),

    #[error("missing <server-config> root element")]
    MissingRoot,

    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),
}

/// Layers declared in a server-config document, in document order.
pub fn parse_layers(xml: &str) -> Result<Vec<String>, ServerConfigError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut seen_layers = false;
    let mut layers = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = open_element(&e, &stack, &mut seen_root, &mut seen_layers)?;
                if name == LAYER {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                open_element(&e, &stack, &mut seen_root, &mut seen_layers)?;
            }
            Event::Text(t) => {
                if let Some(layer) = current.as_mut() {
                    layer.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some(LAYER)
                    && let Some(layer) = current.take()
                    && !layer.is_empty()
                {
                    layers.push(layer);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ServerConfigError::MissingRoot);
    }
    Ok(layers)
}

fn open_element(
    e: &BytesStart<'_>,
    stack: &[String],
    seen_root: &mut bool,
    seen_layers: &mut bool,
) -> Result<String, ServerConfigError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    if e.attributes().next().is_some() {
        return Err(ServerConfigError::UnexpectedAttribute(name));
    }
    let parent = stack.last().map(String::as_str);
    match (parent, name.as_str()) {
        (None, ROOT) => {
            if std::mem::replace(seen_root, true) {
                return Err(ServerConfigError::Duplicate(name));
            }
        }
        (Some(ROOT), LAYERS) => {
            if std::mem::replace(seen_layers, true) {
                return Err(ServerConfigError::Duplicate(name));
            }
        }
        (Some(LAYERS), LAYER) => {}
        _ => return Err(ServerConfigError::UnknownElement(name)),
    }
    Ok(name)
}

/// Render a server-config document declaring `layers`.
pub fn render(layers: &[String]) -> Result<String, ServerConfigError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;
    writer.write_event(Event::Start(BytesStart::new(LAYERS)))?;
    for layer in layers {
        writer.write_event(Event::Start(BytesStart::new(LAYER)))?;
        writer.write_event(Event::Text(BytesText::new(layer)))?;
        writer.write_event(Event::End(BytesEnd::new(LAYER)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(LAYERS)))?;
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Add `extra` layers to an existing document (or a new one), keeping existing order.
pub fn merge_layers(base: Option<&str>, extra: &[String]) -> Result<String, ServerConfigError> {
    let mut layers = match base {
        Some(xml) if !xml.trim().is_empty() => parse_layers(xml)?,
        _ => Vec::new(),
    };
    for layer in extra {
        if !layers.contains(layer) {
            layers.push(layer.clone());
        }
    }
    render(&layers)
}
