use super::XmpError;
use super::namespace::NamespaceRegistry;

/// Container flavour of an XMP array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayForm {
    /// Unordered (`rdf:Bag`).
    Bag,
    /// Ordered (`rdf:Seq`).
    Seq,
    /// Alternatives (`rdf:Alt`).
    Alt,
}

impl ArrayForm {
    pub(crate) fn rdf_element(self) -> &'static str {
        match self {
            Self::Bag => "rdf:Bag",
            Self::Seq => "rdf:Seq",
            Self::Alt => "rdf:Alt",
        }
    }

    pub(crate) fn from_rdf_element(name: &str) -> Option<Self> {
        match name {
            "rdf:Bag" => Some(Self::Bag),
            "rdf:Seq" => Some(Self::Seq),
            "rdf:Alt" => Some(Self::Alt),
            _ => None,
        }
    }
}

/// Shape of the node a [`XmpMeta::set_property`] call writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOptions {
    Simple,
    Struct,
    Array(ArrayForm),
}

/// A value in the metadata tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmpNode {
    Simple(String),
    /// Named fields in insertion order.
    Struct(Vec<XmpField>),
    /// Items addressed 1-based, in insertion order.
    Array(ArrayForm, Vec<XmpNode>),
}

impl XmpNode {
    pub fn as_simple(&self) -> Option<&str> {
        match self {
            Self::Simple(s) => Some(s),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[XmpField]> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[XmpNode]> {
        match self {
            Self::Array(_, items) => Some(items),
            _ => None,
        }
    }
}

/// A named property or struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpField {
    pub namespace: String,
    pub name: String,
    pub value: XmpNode,
}

/// Hierarchical XMP property store scoped to one document.
///
/// Properties are addressed by a schema namespace URI plus a path. A path is
/// a `/`-separated list of steps, each a qualified name optionally followed by
/// a 1-based array index:
///
/// ```text
/// DocumentType                                   (unprefixed: the schema namespace)
/// pdfaExtension:schemas[2]/pdfaSchema:property[1]/pdfaProperty:name
/// ```
///
/// Prefixes resolve through the tree's own namespace registry, so a namespace
/// must be registered before anything can be written under it.
#[derive(Debug, Clone, Default)]
pub struct XmpMeta {
    pub(crate) namespaces: NamespaceRegistry,
    pub(crate) properties: Vec<XmpField>,
}

#[derive(Debug)]
struct Step {
    namespace: String,
    name: String,
    index: Option<usize>,
}

impl XmpMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    /// Top-level properties in insertion order.
    pub fn properties(&self) -> &[XmpField] {
        &self.properties
    }

    /// Names of the top-level properties written under `namespace`.
    pub fn property_names(&self, namespace: &str) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|f| f.namespace == namespace)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn register_namespace(&mut self, uri: &str, prefix: &str) -> Result<(), XmpError> {
        self.namespaces.register(uri, prefix)
    }

    /// Write a node at `path`.
    ///
    /// `Simple` requires a value; `Struct` and `Array` take none and create an
    /// empty container unless a container of the same shape already exists,
    /// in which case it is left untouched. A path ending in `[len + 1]`
    /// appends a new array item.
    pub fn set_property(
        &mut self,
        namespace: &str,
        path: &str,
        value: Option<&str>,
        options: PropertyOptions,
    ) -> Result<(), XmpError> {
        let fresh = match (options, value) {
            (PropertyOptions::Simple, Some(v)) => XmpNode::Simple(v.to_string()),
            (PropertyOptions::Simple, None) => {
                return Err(XmpError::MissingValue(path.to_string()));
            }
            (PropertyOptions::Struct, None) => XmpNode::Struct(Vec::new()),
            (PropertyOptions::Array(form), None) => XmpNode::Array(form, Vec::new()),
            (_, Some(_)) => {
                return Err(XmpError::TypeMismatch(format!(
                    "{path}: a container cannot carry a value"
                )));
            }
        };

        let steps = self.parse_path(namespace, path)?;
        let node = resolve_mut(&mut self.properties, &steps, Some(&fresh), path)?;
        match (node, fresh) {
            (XmpNode::Simple(existing), XmpNode::Simple(v)) => *existing = v,
            (XmpNode::Struct(_), XmpNode::Struct(_)) => {}
            (XmpNode::Array(have, _), XmpNode::Array(want, _)) if *have == want => {}
            _ => {
                return Err(XmpError::TypeMismatch(format!(
                    "{path}: existing node has a different shape"
                )));
            }
        }
        Ok(())
    }

    /// Set a simple field on the struct at `struct_path`, which must exist.
    pub fn set_struct_field(
        &mut self,
        namespace: &str,
        struct_path: &str,
        field_namespace: &str,
        field_name: &str,
        value: &str,
    ) -> Result<(), XmpError> {
        let prefix = self
            .namespaces
            .prefix_for(field_namespace)
            .ok_or_else(|| XmpError::UnknownNamespace(field_namespace.to_string()))?
            .to_string();
        let path = format!("{struct_path}/{prefix}:{field_name}");
        self.set_property(namespace, &path, Some(value), PropertyOptions::Simple)
    }

    /// Number of items in the array at `path`; zero when it does not exist.
    pub fn count_array_items(&self, namespace: &str, path: &str) -> Result<usize, XmpError> {
        match self.node(namespace, path)? {
            None => Ok(0),
            Some(XmpNode::Array(_, items)) => Ok(items.len()),
            Some(_) => Err(XmpError::TypeMismatch(format!("{path}: not an array"))),
        }
    }

    /// Value of the simple property at `path`, if present.
    pub fn get_property(&self, namespace: &str, path: &str) -> Result<Option<&str>, XmpError> {
        match self.node(namespace, path)? {
            None => Ok(None),
            Some(XmpNode::Simple(v)) => Ok(Some(v)),
            Some(_) => Err(XmpError::TypeMismatch(format!("{path}: not a simple value"))),
        }
    }

    /// The node at `path`, if present.
    pub fn node(&self, namespace: &str, path: &str) -> Result<Option<&XmpNode>, XmpError> {
        let steps = self.parse_path(namespace, path)?;
        resolve(&self.properties, &steps, path)
    }

    fn parse_path(&self, namespace: &str, path: &str) -> Result<Vec<Step>, XmpError> {
        if !self.namespaces.contains(namespace) {
            return Err(XmpError::UnknownNamespace(namespace.to_string()));
        }
        let invalid = || XmpError::InvalidPath(path.to_string());
        if path.is_empty() {
            return Err(invalid());
        }

        let mut steps = Vec::new();
        for (i, raw) in path.split('/').enumerate() {
            let (qname, index) = match raw.find('[') {
                Some(open) => {
                    let digits = raw[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
                    let index: usize = digits.parse().map_err(|_| invalid())?;
                    if index == 0 {
                        return Err(invalid());
                    }
                    (&raw[..open], Some(index))
                }
                None => (raw, None),
            };

            let (step_ns, name) = match qname.split_once(':') {
                Some((prefix, local)) => {
                    let uri = self
                        .namespaces
                        .uri_for(prefix)
                        .ok_or_else(|| XmpError::UnknownPrefix(prefix.to_string()))?;
                    if i == 0 && uri != namespace {
                        return Err(XmpError::InvalidPath(format!(
                            "{path}: `{prefix}` does not name schema {namespace}"
                        )));
                    }
                    (uri.to_string(), local)
                }
                None if i == 0 => (namespace.to_string(), qname),
                None => return Err(invalid()),
            };
            if name.is_empty() {
                return Err(invalid());
            }

            steps.push(Step {
                namespace: step_ns,
                name: name.to_string(),
                index,
            });
        }
        Ok(steps)
    }
}

fn resolve_mut<'a>(
    fields: &'a mut Vec<XmpField>,
    steps: &[Step],
    create: Option<&XmpNode>,
    path: &str,
) -> Result<&'a mut XmpNode, XmpError> {
    let Some((step, rest)) = steps.split_first() else {
        return Err(XmpError::InvalidPath(path.to_string()));
    };
    let leaf = rest.is_empty();

    // An indexed leaf appends to an array that must already exist.
    let field_seed = if leaf && step.index.is_none() {
        create.cloned()
    } else {
        None
    };
    let node = field_mut(fields, step, field_seed, path)?;
    let node = match step.index {
        Some(index) => item_mut(node, index, if leaf { create } else { None }, path)?,
        None => node,
    };

    if leaf {
        return Ok(node);
    }
    match node {
        XmpNode::Struct(children) => resolve_mut(children, rest, create, path),
        _ => Err(XmpError::TypeMismatch(format!(
            "{path}: `{}` is not a struct",
            step.name
        ))),
    }
}

fn field_mut<'a>(
    fields: &'a mut Vec<XmpField>,
    step: &Step,
    seed: Option<XmpNode>,
    path: &str,
) -> Result<&'a mut XmpNode, XmpError> {
    if let Some(pos) = fields
        .iter()
        .position(|f| f.namespace == step.namespace && f.name == step.name)
    {
        return Ok(&mut fields[pos].value);
    }
    let Some(value) = seed else {
        return Err(XmpError::NotFound(path.to_string()));
    };
    fields.push(XmpField {
        namespace: step.namespace.clone(),
        name: step.name.clone(),
        value,
    });
    let last = fields.len() - 1;
    Ok(&mut fields[last].value)
}

fn item_mut<'a>(
    node: &'a mut XmpNode,
    index: usize,
    seed: Option<&XmpNode>,
    path: &str,
) -> Result<&'a mut XmpNode, XmpError> {
    let XmpNode::Array(_, items) = node else {
        return Err(XmpError::TypeMismatch(format!("{path}: not an array")));
    };
    let len = items.len();
    if index == len + 1 {
        if let Some(seed) = seed {
            items.push(seed.clone());
            return Ok(&mut items[len]);
        }
    }
    if index > len {
        return Err(XmpError::IndexOutOfRange {
            path: path.to_string(),
            index,
            len,
        });
    }
    Ok(&mut items[index - 1])
}

fn resolve<'a>(
    fields: &'a [XmpField],
    steps: &[Step],
    path: &str,
) -> Result<Option<&'a XmpNode>, XmpError> {
    let Some((step, rest)) = steps.split_first() else {
        return Err(XmpError::InvalidPath(path.to_string()));
    };
    let Some(field) = fields
        .iter()
        .find(|f| f.namespace == step.namespace && f.name == step.name)
    else {
        return Ok(None);
    };

    let node = match step.index {
        None => &field.value,
        Some(index) => match &field.value {
            XmpNode::Array(_, items) => match items.get(index - 1) {
                Some(item) => item,
                None => return Ok(None),
            },
            _ => return Err(XmpError::TypeMismatch(format!("{path}: not an array"))),
        },
    };

    if rest.is_empty() {
        return Ok(Some(node));
    }
    match node {
        XmpNode::Struct(children) => resolve(children, rest, path),
        _ => Err(XmpError::TypeMismatch(format!(
            "{path}: `{}` is not a struct",
            step.name
        ))),
    }
}
