//! The mock engine's document tree and the fixture specs that populate it.

use xedit_core::{Color, DefType, ElementFlags, ElementType, SmashType, ValueType, bytes_to_hex, form_id_to_string};

pub type NodeId = usize;

/// Id of the root node.
pub const ROOT: NodeId = 0;

/// Declarative description of a node and its subtree.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub(crate) name: String,
    pub(crate) element_type: ElementType,
    pub(crate) def_type: DefType,
    pub(crate) value_type: ValueType,
    pub(crate) smash_type: SmashType,
    pub(crate) signature: Option<String>,
    pub(crate) flags: ElementFlags,
    pub(crate) value: String,
    pub(crate) flag_names: Vec<String>,
    pub(crate) enum_options: Vec<String>,
    pub(crate) children: Vec<NodeSpec>,
    /// Children the schema allows but the node does not carry yet.
    pub(crate) optional: Vec<NodeSpec>,
    /// Template for new array items.
    pub(crate) item: Option<Box<NodeSpec>>,
}

impl NodeSpec {
    fn leaf(name: &str, def_type: DefType, value_type: ValueType, smash_type: SmashType, value: String) -> Self {
        Self {
            name: name.to_string(),
            element_type: ElementType::SubRecord,
            def_type,
            value_type,
            smash_type,
            signature: signature_of(name),
            flags: ElementFlags::REMOVABLE | ElementFlags::EDITABLE,
            value,
            flag_names: Vec::new(),
            enum_options: Vec::new(),
            children: Vec::new(),
            optional: Vec::new(),
            item: None,
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self::leaf(name, DefType::String, ValueType::String, SmashType::String, value.to_string())
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self::leaf(name, DefType::Integer, ValueType::Number, SmashType::Integer, value.to_string())
    }

    pub fn float(name: &str, value: f64) -> Self {
        Self::leaf(name, DefType::Float, ValueType::Number, SmashType::Float, format_float(value))
    }

    /// Form id link. `0` is a null reference.
    pub fn reference(name: &str, form_id: u32) -> Self {
        Self::leaf(
            name,
            DefType::Integer,
            ValueType::Reference,
            SmashType::Integer,
            form_id_to_string(form_id),
        )
    }

    pub fn bytes(name: &str, bytes: &[u8]) -> Self {
        Self::leaf(name, DefType::ByteArray, ValueType::Bytes, SmashType::ByteArray, bytes_to_hex(bytes))
    }

    pub fn enumeration(name: &str, options: &[&str], selected: &str) -> Self {
        let mut spec = Self::leaf(
            name,
            DefType::IntegerFormater,
            ValueType::Enum,
            SmashType::Integer,
            selected.to_string(),
        );
        spec.enum_options = options.iter().map(|s| s.to_string()).collect();
        spec
    }

    pub fn flags(name: &str, names: &[&str], enabled: &[&str]) -> Self {
        let mut spec = Self::leaf(name, DefType::IntegerFormater, ValueType::Flags, SmashType::Flag, String::new());
        spec.flag_names = names.iter().map(|s| s.to_string()).collect();
        spec.value = names
            .iter()
            .filter(|n| enabled.contains(*n))
            .copied()
            .collect::<Vec<_>>()
            .join(",");
        spec
    }

    pub fn color(name: &str, color: Color) -> Self {
        let mut spec = Self::structure(
            name,
            Color::CHANNELS
                .iter()
                .zip(color.channels())
                .map(|(channel, v)| NodeSpec::integer(channel, i64::from(v)).element_type(ElementType::Value))
                .collect(),
        );
        spec.value_type = ValueType::Color;
        spec
    }

    pub fn structure(name: &str, children: Vec<NodeSpec>) -> Self {
        let mut spec = Self::leaf(name, DefType::Struct, ValueType::Struct, SmashType::Struct, String::new());
        spec.element_type = ElementType::SubRecordStruct;
        spec.children = children;
        spec
    }

    /// Unsorted array whose new items are built from `item`.
    pub fn array(name: &str, item: NodeSpec, items: Vec<NodeSpec>) -> Self {
        let mut spec = Self::leaf(name, DefType::Array, ValueType::Array, SmashType::UnsortedArray, String::new());
        spec.element_type = ElementType::SubRecordArray;
        spec.flags |= ElementFlags::CAN_ADD;
        spec.children = items;
        spec.item = Some(Box::new(item));
        spec
    }

    /// Array the engine keeps ordered by item sort key.
    pub fn sorted_array(name: &str, item: NodeSpec, items: Vec<NodeSpec>) -> Self {
        let mut spec = Self::array(name, item, items);
        spec.smash_type = SmashType::SortedArray;
        spec.flags |= ElementFlags::SORTED;
        spec
    }

    pub fn element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn removable(mut self, removable: bool) -> Self {
        self.flags.set(ElementFlags::REMOVABLE, removable);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.remove(ElementFlags::EDITABLE);
        self
    }

    pub fn fixed(mut self) -> Self {
        self.flags |= ElementFlags::FIXED;
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Declare a child the schema allows to be added later. Marks the node as
    /// accepting additions.
    pub fn with_optional(mut self, child: NodeSpec) -> Self {
        self.flags |= ElementFlags::CAN_ADD;
        self.optional.push(child);
        self
    }

    pub(crate) fn matches(&self, segment: &str) -> bool {
        self.name == segment || self.signature.as_deref() == Some(segment)
    }
}

fn signature_of(name: &str) -> Option<String> {
    (name.len() == 4 && name.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'))
        .then(|| name.to_string())
}

pub(crate) fn format_float(value: f64) -> String {
    format!("{value:.6}")
}

/// One live node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) spec: NodeSpec,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) form_id: Option<u32>,
    /// Master names, for file nodes.
    pub(crate) masters: Vec<String>,
}

impl Node {
    pub(crate) fn is(&self, element_type: ElementType) -> bool {
        self.spec.element_type == element_type
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(self.spec.element_type, ElementType::Array | ElementType::SubRecordArray)
    }

    pub(crate) fn has(&self, flag: ElementFlags) -> bool {
        self.spec.flags.contains(flag)
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(
            self.spec.def_type,
            DefType::Integer | DefType::IntegerFormater | DefType::Float
        ) && !matches!(self.spec.value_type, ValueType::Enum | ValueType::Flags | ValueType::Reference)
    }
}

/// Arena of nodes. Removed slots stay `None` so ids are never reused.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Default for Tree {
    fn default() -> Self {
        let mut root = NodeSpec::structure("", Vec::new());
        root.flags = ElementFlags::empty();
        Self {
            nodes: vec![Some(Node {
                spec: root,
                parent: None,
                children: Vec::new(),
                form_id: None,
                masters: Vec::new(),
            })],
        }
    }
}

impl Tree {
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Instantiate `spec` under `parent`, at `index` or at the end.
    pub fn insert(&mut self, parent: NodeId, mut spec: NodeSpec, index: Option<usize>) -> NodeId {
        let children = std::mem::take(&mut spec.children);
        let id = self.nodes.len();
        self.nodes.push(Some(Node {
            spec,
            parent: Some(parent),
            children: Vec::new(),
            form_id: None,
            masters: Vec::new(),
        }));
        if let Some(p) = self.get_mut(parent) {
            let at = index.unwrap_or(p.children.len()).min(p.children.len());
            p.children.insert(at, id);
        }
        for child in children {
            self.insert(id, child, None);
        }
        id
    }

    /// Detach and drop `id` with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id)
            && let Some(p) = self.get_mut(parent)
        {
            p.children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
    }

    /// Rebuild a spec from a live subtree.
    pub fn snapshot(&self, id: NodeId) -> Option<NodeSpec> {
        let node = self.get(id)?;
        let mut spec = node.spec.clone();
        spec.children = node.children.iter().filter_map(|&c| self.snapshot(c)).collect();
        Some(spec)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn ancestor(&self, id: NodeId, element_type: ElementType) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.get(c)?.is(element_type) {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    /// Every live node under `id`, depth first, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    // ========================================================================
    // Paths
    // ========================================================================

    fn child_matching(&self, id: NodeId, segment: &str) -> Option<NodeId> {
        if let Some(index) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let index: usize = index.parse().ok()?;
            return self.children(id).get(index).copied();
        }
        let direct = self.children(id).iter().copied().find(|&c| {
            self.get(c).is_some_and(|n| {
                n.spec.matches(segment)
                    || n.form_id.is_some_and(|f| form_id_to_string(f).eq_ignore_ascii_case(segment))
            })
        });
        if direct.is_some() {
            return direct;
        }
        // Files also resolve records by bare form id, skipping the group level.
        let node = self.get(id)?;
        if node.is(ElementType::File)
            && let Ok(form_id) = u32::from_str_radix(segment, 16)
        {
            return self
                .descendants(id)
                .into_iter()
                .find(|&d| self.get(d).is_some_and(|n| n.is(ElementType::MainRecord) && n.form_id == Some(form_id)));
        }
        None
    }

    /// Resolve a `\` separated path relative to `id`. An empty path is `id`.
    pub fn resolve(&self, id: NodeId, path: &str) -> Option<NodeId> {
        let mut cur = id;
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            cur = self.child_matching(cur, segment)?;
        }
        self.get(cur).map(|_| cur)
    }

    fn segment(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        if let Some(parent) = node.parent
            && self.get(parent).is_some_and(Node::is_array)
        {
            return format!("[{}]", self.index_in_parent(id).unwrap_or(0));
        }
        match (node.spec.element_type, node.form_id) {
            (ElementType::MainRecord, Some(form_id)) => form_id_to_string(form_id),
            _ => node.spec.name.clone(),
        }
    }

    /// Path from the root. `short` drops group levels, `local` starts below
    /// the enclosing record.
    pub fn path(&self, id: NodeId, short: bool, local: bool) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ROOT {
                break;
            }
            let Some(node) = self.get(c) else { break };
            if local && node.is(ElementType::MainRecord) {
                break;
            }
            if !(short && node.is(ElementType::GroupRecord)) {
                segments.push(self.segment(c));
            }
            cur = node.parent;
        }
        segments.reverse();
        segments.join("\\")
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Key the engine orders sorted arrays by.
    pub fn sort_key(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        if !node.children.is_empty() {
            return node
                .children
                .iter()
                .map(|&c| self.sort_key(c))
                .collect::<Vec<_>>()
                .join("|");
        }
        if node.is_numeric()
            && let Ok(v) = node.spec.value.parse::<f64>()
        {
            return format!("{:024.6}", v + 1e15);
        }
        node.spec.value.clone()
    }

    /// Re-sort the nearest sorted array enclosing `id`, if any.
    pub fn resort_enclosing(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.get(c).is_some_and(|n| n.is_array() && n.has(ElementFlags::SORTED)) {
                let mut keyed: Vec<(String, NodeId)> =
                    self.children(c).iter().map(|&child| (self.sort_key(child), child)).collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                if let Some(node) = self.get_mut(c) {
                    node.children = keyed.into_iter().map(|(_, child)| child).collect();
                }
                return;
            }
            cur = self.parent(c);
        }
    }

    /// Flag `id` and its ancestors as modified.
    pub fn mark_modified(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ROOT {
                break;
            }
            let Some(node) = self.get_mut(c) else { break };
            node.spec.flags |= ElementFlags::MODIFIED;
            cur = node.parent;
        }
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn to_json(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return "null".to_string();
        };
        if node.children.is_empty() {
            return json_string(&node.spec.value);
        }
        if node.is_array() {
            let items: Vec<String> = node.children.iter().map(|&c| self.to_json(c)).collect();
            return format!("[{}]", items.join(","));
        }
        let fields: Vec<String> = node
            .children
            .iter()
            .filter_map(|&c| Some(format!("{}:{}", json_string(&self.segment(c)), self.to_json(c))).filter(|_| self.get(c).is_some()))
            .collect();
        format!("{{{}}}", fields.join(","))
    }
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
