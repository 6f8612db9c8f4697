use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

use super::XmpError;
use super::tree::{ArrayForm, XmpField, XmpMeta, XmpNode};

impl XmpMeta {
    /// Read an XMP packet (RDF/XML) into a tree.
    ///
    /// Understands element and attribute property forms, `rdf:Bag`/`rdf:Seq`/
    /// `rdf:Alt` arrays, and structs written either with
    /// `rdf:parseType="Resource"` or a nested `rdf:Description`. Prefixes the
    /// packet declares are added to the tree's registry; a prefix already
    /// bound to another URI is replaced by a generated one. Language
    /// qualifiers on `rdf:Alt` items are not retained.
    pub fn parse(packet: &str) -> Result<Self, XmpError> {
        let mut parser = Parser {
            reader: Reader::from_str(packet),
            prefixes: HashMap::new(),
            meta: XmpMeta::new(),
        };
        parser.run()?;
        Ok(parser.meta)
    }
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    /// Prefix bindings as declared in the packet.
    prefixes: HashMap<String, String>,
    meta: XmpMeta,
}

fn parse_err(e: impl std::fmt::Display) -> XmpError {
    XmpError::Parse(format!("XML parse error: {e}"))
}

fn eof() -> XmpError {
    XmpError::Parse("unexpected end of packet".into())
}

fn qname(e: &BytesStart<'_>) -> Result<String, XmpError> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(parse_err)
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<Event<'a>, XmpError> {
        self.reader.read_event().map_err(parse_err)
    }

    fn run(&mut self) -> Result<(), XmpError> {
        loop {
            match self.next()? {
                Event::Start(e) => {
                    self.learn(&e)?;
                    if qname(&e)? == "rdf:Description" {
                        let mut fields = self.attribute_fields(&e)?;
                        fields.extend(self.fields_until_end()?);
                        self.merge(fields);
                    }
                }
                Event::Empty(e) => {
                    self.learn(&e)?;
                    if qname(&e)? == "rdf:Description" {
                        let fields = self.attribute_fields(&e)?;
                        self.merge(fields);
                    }
                }
                Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }

    fn merge(&mut self, fields: Vec<XmpField>) {
        for field in fields {
            match self
                .meta
                .properties
                .iter_mut()
                .find(|f| f.namespace == field.namespace && f.name == field.name)
            {
                Some(existing) => existing.value = field.value,
                None => self.meta.properties.push(field),
            }
        }
    }

    /// Pick up `xmlns:*` declarations from an element.
    fn learn(&mut self, e: &BytesStart<'_>) -> Result<(), XmpError> {
        for attr in e.attributes() {
            let attr = attr.map_err(parse_err)?;
            let key = std::str::from_utf8(attr.key.as_ref()).map_err(parse_err)?;
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                let uri = attr.unescape_value().map_err(parse_err)?.into_owned();
                self.meta.namespaces.register_lenient(&uri, prefix)?;
                self.prefixes.insert(prefix.to_string(), uri);
            }
        }
        Ok(())
    }

    fn resolve(&self, qname: &str) -> Result<(String, String), XmpError> {
        let (prefix, local) = qname
            .split_once(':')
            .ok_or_else(|| XmpError::Parse(format!("unqualified name `{qname}`")))?;
        let uri = self
            .prefixes
            .get(prefix)
            .map(String::as_str)
            .or_else(|| self.meta.namespaces.uri_for(prefix))
            .ok_or_else(|| XmpError::UnknownPrefix(prefix.to_string()))?;
        Ok((uri.to_string(), local.to_string()))
    }

    fn is_resource(e: &BytesStart<'_>) -> Result<bool, XmpError> {
        for attr in e.attributes() {
            let attr = attr.map_err(parse_err)?;
            if attr.key.as_ref() == b"rdf:parseType" {
                return Ok(attr.value.as_ref() == b"Resource");
            }
        }
        Ok(false)
    }

    /// Simple properties written as attributes (`pdfaid:part="3"`).
    fn attribute_fields(&self, e: &BytesStart<'_>) -> Result<Vec<XmpField>, XmpError> {
        let mut fields = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(parse_err)?;
            let key = std::str::from_utf8(attr.key.as_ref()).map_err(parse_err)?;
            if key == "xmlns"
                || key.starts_with("xmlns:")
                || key.starts_with("rdf:")
                || key.starts_with("xml:")
            {
                continue;
            }
            let (namespace, name) = self.resolve(key)?;
            let value = attr.unescape_value().map_err(parse_err)?.into_owned();
            fields.push(XmpField {
                namespace,
                name,
                value: XmpNode::Simple(value),
            });
        }
        Ok(fields)
    }

    fn empty_node(&self, e: &BytesStart<'_>) -> Result<XmpNode, XmpError> {
        let fields = self.attribute_fields(e)?;
        if Self::is_resource(e)? || !fields.is_empty() {
            Ok(XmpNode::Struct(fields))
        } else {
            Ok(XmpNode::Simple(String::new()))
        }
    }

    fn fields_until_end(&mut self) -> Result<Vec<XmpField>, XmpError> {
        let mut fields = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) => {
                    self.learn(&e)?;
                    let (namespace, name) = self.resolve(&qname(&e)?)?;
                    let value = self.node_after_start(&e)?;
                    fields.push(XmpField {
                        namespace,
                        name,
                        value,
                    });
                }
                Event::Empty(e) => {
                    self.learn(&e)?;
                    let (namespace, name) = self.resolve(&qname(&e)?)?;
                    let value = self.empty_node(&e)?;
                    fields.push(XmpField {
                        namespace,
                        name,
                        value,
                    });
                }
                Event::End(_) => return Ok(fields),
                Event::Eof => return Err(eof()),
                _ => {}
            }
        }
    }

    fn items_until_end(&mut self) -> Result<Vec<XmpNode>, XmpError> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) => {
                    self.learn(&e)?;
                    let name = qname(&e)?;
                    if name != "rdf:li" {
                        return Err(XmpError::Parse(format!("expected rdf:li, found <{name}>")));
                    }
                    items.push(self.node_after_start(&e)?);
                }
                Event::Empty(e) => {
                    self.learn(&e)?;
                    let name = qname(&e)?;
                    if name != "rdf:li" {
                        return Err(XmpError::Parse(format!("expected rdf:li, found <{name}>")));
                    }
                    items.push(self.empty_node(&e)?);
                }
                Event::End(_) => return Ok(items),
                Event::Eof => return Err(eof()),
                _ => {}
            }
        }
    }

    /// Parse the value of a property (or `rdf:li`) whose start tag was just read.
    /// Consumes the matching end tag.
    fn node_after_start(&mut self, start: &BytesStart<'_>) -> Result<XmpNode, XmpError> {
        if Self::is_resource(start)? {
            let mut fields = self.attribute_fields(start)?;
            fields.extend(self.fields_until_end()?);
            return Ok(XmpNode::Struct(fields));
        }
        let attr_fields = self.attribute_fields(start)?;

        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape().map_err(parse_err)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(_) => {
                    return Ok(if attr_fields.is_empty() {
                        XmpNode::Simple(text)
                    } else {
                        XmpNode::Struct(attr_fields)
                    });
                }
                Event::Start(e) => {
                    ensure_blank(&text)?;
                    self.learn(&e)?;
                    let name = qname(&e)?;
                    let node = if let Some(form) = ArrayForm::from_rdf_element(&name) {
                        XmpNode::Array(form, self.items_until_end()?)
                    } else if name == "rdf:Description" {
                        let mut fields = self.attribute_fields(&e)?;
                        fields.extend(self.fields_until_end()?);
                        XmpNode::Struct(fields)
                    } else {
                        return Err(XmpError::Parse(format!(
                            "unexpected <{name}> inside a property value"
                        )));
                    };
                    self.expect_end()?;
                    return Ok(node);
                }
                Event::Empty(e) => {
                    ensure_blank(&text)?;
                    self.learn(&e)?;
                    let name = qname(&e)?;
                    let node = if let Some(form) = ArrayForm::from_rdf_element(&name) {
                        XmpNode::Array(form, Vec::new())
                    } else if name == "rdf:Description" {
                        XmpNode::Struct(self.attribute_fields(&e)?)
                    } else {
                        return Err(XmpError::Parse(format!(
                            "unexpected <{name}/> inside a property value"
                        )));
                    };
                    self.expect_end()?;
                    return Ok(node);
                }
                Event::Eof => return Err(eof()),
                _ => {}
            }
        }
    }

    fn expect_end(&mut self) -> Result<(), XmpError> {
        loop {
            match self.next()? {
                Event::End(_) => return Ok(()),
                Event::Text(t) => ensure_blank(&t.unescape().map_err(parse_err)?)?,
                Event::Comment(_) | Event::PI(_) => {}
                Event::Eof => return Err(eof()),
                other => {
                    return Err(XmpError::Parse(format!(
                        "expected end tag, found {other:?}"
                    )));
                }
            }
        }
    }
}

fn ensure_blank(text: &str) -> Result<(), XmpError> {
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(XmpError::Parse("mixed content in property value".into()))
    }
}
