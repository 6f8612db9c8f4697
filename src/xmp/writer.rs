use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::io::Cursor;

use super::XmpError;
use super::namespace::NamespaceRegistry;
use super::ns;
use super::tree::{ArrayForm, XmpField, XmpMeta, XmpNode};

/// Packet id fixed by the XMP specification.
const PACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";

type Out = Writer<Cursor<Vec<u8>>>;

fn emit(w: &mut Out, event: Event<'_>) -> Result<(), XmpError> {
    w.write_event(event)
        .map_err(|e| XmpError::Write(format!("XML write error: {e}")))
}

fn open(w: &mut Out, name: &str, attrs: &[(&str, &str)]) -> Result<(), XmpError> {
    emit(w, Event::Start(BytesStart::new(name).with_attributes(attrs.iter().copied())))
}

fn close(w: &mut Out, name: &str) -> Result<(), XmpError> {
    emit(w, Event::End(BytesEnd::new(name)))
}

impl XmpMeta {
    /// Serialize the tree as a complete XMP packet (RDF/XML).
    ///
    /// Top-level properties are grouped into one `rdf:Description` per schema
    /// namespace, in the order each namespace was first written. Structs use
    /// `rdf:parseType="Resource"`.
    pub fn serialize(&self) -> Result<String, XmpError> {
        let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        let begin = format!("xpacket begin=\"\u{FEFF}\" id=\"{PACKET_ID}\"");
        emit(&mut w, Event::PI(BytesPI::new(begin)))?;
        open(&mut w, "x:xmpmeta", &[("xmlns:x", ns::X)])?;
        open(&mut w, "rdf:RDF", &[("xmlns:rdf", ns::RDF)])?;

        for schema in self.schema_order() {
            let fields: Vec<&XmpField> = self
                .properties
                .iter()
                .filter(|f| f.namespace == schema)
                .collect();

            let mut used = Vec::new();
            for field in &fields {
                collect_namespaces(field, &mut used);
            }
            let declarations = used
                .iter()
                .map(|uri| {
                    let prefix = prefix_of(&self.namespaces, uri)?;
                    Ok((format!("xmlns:{prefix}"), uri.to_string()))
                })
                .collect::<Result<Vec<_>, XmpError>>()?;

            let mut attrs: Vec<(&str, &str)> = vec![("rdf:about", "")];
            attrs.extend(declarations.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            open(&mut w, "rdf:Description", &attrs)?;
            for field in fields {
                write_field(&mut w, &self.namespaces, field)?;
            }
            close(&mut w, "rdf:Description")?;
        }

        close(&mut w, "rdf:RDF")?;
        close(&mut w, "x:xmpmeta")?;
        emit(&mut w, Event::PI(BytesPI::new("xpacket end=\"w\"")))?;

        String::from_utf8(w.into_inner().into_inner())
            .map_err(|e| XmpError::Write(format!("XML UTF-8 error: {e}")))
    }

    fn schema_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::new();
        for field in &self.properties {
            if !order.contains(&field.namespace.as_str()) {
                order.push(&field.namespace);
            }
        }
        order
    }
}

fn prefix_of<'a>(registry: &'a NamespaceRegistry, uri: &str) -> Result<&'a str, XmpError> {
    registry
        .prefix_for(uri)
        .ok_or_else(|| XmpError::UnknownNamespace(uri.to_string()))
}

fn collect_namespaces<'a>(field: &'a XmpField, out: &mut Vec<&'a str>) {
    if !out.contains(&field.namespace.as_str()) {
        out.push(&field.namespace);
    }
    collect_node_namespaces(&field.value, out);
}

fn collect_node_namespaces<'a>(node: &'a XmpNode, out: &mut Vec<&'a str>) {
    match node {
        XmpNode::Simple(_) => {}
        XmpNode::Struct(fields) => fields.iter().for_each(|f| collect_namespaces(f, out)),
        XmpNode::Array(_, items) => items.iter().for_each(|i| collect_node_namespaces(i, out)),
    }
}

fn write_field(
    w: &mut Out,
    registry: &NamespaceRegistry,
    field: &XmpField,
) -> Result<(), XmpError> {
    let qname = format!("{}:{}", prefix_of(registry, &field.namespace)?, field.name);
    write_node(w, registry, &qname, &field.value, &[])
}

fn write_node(
    w: &mut Out,
    registry: &NamespaceRegistry,
    element: &str,
    node: &XmpNode,
    attrs: &[(&str, &str)],
) -> Result<(), XmpError> {
    match node {
        XmpNode::Simple(value) => {
            open(w, element, attrs)?;
            emit(w, Event::Text(BytesText::new(value)))?;
            close(w, element)?;
        }
        XmpNode::Struct(fields) => {
            let mut attrs = attrs.to_vec();
            attrs.push(("rdf:parseType", "Resource"));
            open(w, element, &attrs)?;
            for field in fields {
                write_field(w, registry, field)?;
            }
            close(w, element)?;
        }
        XmpNode::Array(form, items) => {
            open(w, element, attrs)?;
            open(w, form.rdf_element(), &[])?;
            for (i, item) in items.iter().enumerate() {
                // Alt arrays are written as language alternatives with the
                // first item as the default.
                let item_attrs: &[(&str, &str)] = if *form == ArrayForm::Alt && i == 0 {
                    &[("xml:lang", "x-default")]
                } else {
                    &[]
                };
                write_node(w, registry, "rdf:li", item, item_attrs)?;
            }
            close(w, form.rdf_element())?;
            close(w, element)?;
        }
    }
    Ok(())
}
