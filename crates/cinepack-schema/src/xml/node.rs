use crate::{AssetId, Fraction, SchemaError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// An owned XML element: local name, attributes, concatenated text, and
/// child elements.
///
/// Namespace prefixes are dropped, so `msp-cpl:MainStereoscopicPicture` is
/// looked up as `MainStereoscopicPicture`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a whole document and return its root element.
    pub fn parse_str(input: &str) -> Result<XmlNode, SchemaError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(XmlNode {
                        name: local_name(e.local_name().as_ref()),
                        attributes: attributes(&e)?,
                        ..XmlNode::default()
                    });
                }
                Event::Empty(e) => {
                    let node = XmlNode {
                        name: local_name(e.local_name().as_ref()),
                        attributes: attributes(&e)?,
                        ..XmlNode::default()
                    };
                    attach(&mut stack, &mut root, node);
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| SchemaError::Malformed("document has no root element".to_owned()))
    }

    pub fn parse_file(path: &Path) -> Result<XmlNode, SchemaError> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        XmlNode::parse_str(&content)
    }

    pub fn optional_child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child(&self, name: &str) -> Result<&XmlNode, SchemaError> {
        self.optional_child(name)
            .ok_or_else(|| SchemaError::MissingNode {
                parent: self.name.clone(),
                child: name.to_owned(),
            })
    }

    /// Value of attribute `name`, matched on its local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every element named `name` below this one, depth first.
    pub fn descendants_named<'a>(&'a self, name: &'a str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn string_child(&self, name: &str) -> Result<String, SchemaError> {
        Ok(self.child(name)?.text.trim().to_owned())
    }

    pub fn optional_string_child(&self, name: &str) -> Option<String> {
        self.optional_child(name).map(|c| c.text.trim().to_owned())
    }

    pub fn number_child<T: FromStr>(&self, name: &str) -> Result<T, SchemaError> {
        let text = self.string_child(name)?;
        text.parse().map_err(|_| SchemaError::InvalidValue {
            field: name.to_owned(),
            value: text,
        })
    }

    pub fn optional_number_child<T: FromStr>(&self, name: &str) -> Result<Option<T>, SchemaError> {
        match self.optional_string_child(name) {
            None => Ok(None),
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(|_| SchemaError::InvalidValue {
                    field: name.to_owned(),
                    value: text,
                }),
        }
    }

    pub fn fraction_child(&self, name: &str) -> Result<Fraction, SchemaError> {
        self.string_child(name)?.parse()
    }

    pub fn optional_fraction_child(&self, name: &str) -> Result<Option<Fraction>, SchemaError> {
        self.optional_string_child(name)
            .map(|text| text.parse())
            .transpose()
    }

    pub fn id_child(&self, name: &str) -> Result<AssetId, SchemaError> {
        AssetId::parse(&self.string_child(name)?)
    }

    /// `true`/`false` text, with absence meaning `false`.
    pub fn bool_child(&self, name: &str) -> bool {
        self.optional_string_child(name)
            .is_some_and(|t| t.eq_ignore_ascii_case("true") || t == "1")
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, SchemaError> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        out.push((
            local_name(attr.key.local_name().as_ref()),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(out)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Name of the root element of an XML file, without namespace prefix.
pub fn root_element_name(path: &Path) -> Result<String, SchemaError> {
    let content = fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = Reader::from_str(&content);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => return Ok(local_name(e.local_name().as_ref())),
            Event::Eof => {
                return Err(SchemaError::Malformed(format!(
                    "{} has no root element",
                    path.display()
                )))
            }
            _ => {}
        }
    }
}
