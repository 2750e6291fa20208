use crate::SchemaError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Builds a UTF-8 XML document element by element.
///
/// Documents are assembled field by field; nothing is validated against a
/// schema.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// Start a document with an XML declaration and open its root element.
    pub fn document(root: &str, attributes: &[(&str, &str)]) -> Result<Self, SchemaError> {
        let mut w = Self::new();
        w.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        w.open_with(root, attributes)?;
        Ok(w)
    }

    pub fn open(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.open_with(name, &[])
    }

    pub fn open_with(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> Result<&mut Self, SchemaError> {
        let mut start = BytesStart::new(name);
        for attr in attributes {
            start.push_attribute(*attr);
        }
        self.inner.write_event(Event::Start(start))?;
        Ok(self)
    }

    pub fn close(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// `<name>text</name>`, with the text escaped.
    pub fn text_element(
        &mut self,
        name: &str,
        text: impl AsRef<str>,
    ) -> Result<&mut Self, SchemaError> {
        self.inner.write_event(Event::Start(BytesStart::new(name)))?;
        self.inner
            .write_event(Event::Text(BytesText::new(text.as_ref())))?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// `<name/>`
    pub fn empty(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.inner.write_event(Event::Empty(BytesStart::new(name)))?;
        Ok(self)
    }

    /// Close the root element and return the document bytes, newline-terminated.
    pub fn finish(mut self, root: &str) -> Result<Vec<u8>, SchemaError> {
        self.close(root)?;
        let mut bytes = self.inner.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Bytes written so far, for fragments that are not whole documents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}
