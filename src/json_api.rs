use crate::{
    atom::Atom,
    known_boxes::KnownBox,
    property::{Property, PropertyValue, TimeRole},
    tree::AtomTree,
};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// A JSON-serializable snapshot of one atom and its subtree.
///
/// Intended for the external writer (which atoms are dirty) and for
/// inspection tools.
#[derive(Serialize)]
pub struct JsonAtom {
    pub typ: String,
    pub full_name: String,
    pub dirty: bool,
    pub properties: Vec<JsonProperty>,
    pub children: Option<Vec<JsonAtom>>,
}

#[derive(Serialize)]
pub struct JsonProperty {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "is_untimed")]
    pub role: TimeRole,
    /// Bytes render as lowercase hex, tables as arrays of row objects.
    pub value: Value,
}

fn is_untimed(role: &TimeRole) -> bool {
    *role == TimeRole::None
}

pub fn atom_to_json(atom: &Atom) -> JsonAtom {
    let children = if atom.children().is_empty() {
        None
    } else {
        Some(atom.children().iter().map(atom_to_json).collect())
    };
    JsonAtom {
        typ: atom.typ().to_string(),
        full_name: KnownBox::from(atom.typ()).full_name().to_string(),
        dirty: atom.is_dirty(),
        properties: atom.properties().iter().map(property_to_json).collect(),
        children,
    }
}

/// Top-level atoms of `tree`, without the synthetic root.
pub fn tree_to_json(tree: &AtomTree) -> Vec<JsonAtom> {
    tree.root().children().iter().map(atom_to_json).collect()
}

pub fn to_json_string(tree: &AtomTree, pretty: bool) -> serde_json::Result<String> {
    let atoms = tree_to_json(tree);
    if pretty {
        serde_json::to_string_pretty(&atoms)
    } else {
        serde_json::to_string(&atoms)
    }
}

fn property_to_json(prop: &Property) -> JsonProperty {
    JsonProperty {
        name: prop.name().to_string(),
        kind: prop.kind().to_string(),
        role: prop.role(),
        value: value_to_json(prop.value()),
    }
}

fn value_to_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Unsigned(v) => json!(v),
        PropertyValue::Signed(v) => json!(v),
        PropertyValue::Float32(v) => json!(v),
        PropertyValue::String(s) => json!(s),
        PropertyValue::Bytes(b) => json!(hex::encode(b)),
        PropertyValue::Table(rows) => Value::Array(
            rows.iter()
                .map(|row| {
                    let cells: Map<String, Value> = row
                        .cells()
                        .iter()
                        .map(|c| (c.name().to_string(), value_to_json(c.value())))
                        .collect();
                    Value::Object(cells)
                })
                .collect(),
        ),
    }
}
