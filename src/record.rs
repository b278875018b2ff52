//! Record kinds and the record wrapper.
//!
//! A [`RecordKind`] is what a signature dispatches to. Each kind carries a
//! static attribute table; a few add views of their own (placed object
//! coordinates, cell child groups, mesh paths).

use std::collections::BTreeSet;

use xedit_core::{Signature, XEditError, XEditResult, signatures};
use xedit_registry::SubclassRegistry;

use crate::attribute::{self, Attribute, Storage};
use crate::element::{Element, Entry, Object, Value, element_wrapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Armor,
    ArmorAddon,
    Global,
    PlacedObject,
    HeadPart,
    Race,
    Cell,
    Npc,
    NavMesh,
    /// A caller-defined kind, bound with
    /// [`Session::register_record_kind`](crate::Session::register_record_kind).
    Custom {
        name: &'static str,
        attributes: &'static [Attribute],
    },
}

impl RecordKind {
    pub const BUILTIN: [RecordKind; 9] = [
        RecordKind::Armor,
        RecordKind::ArmorAddon,
        RecordKind::Global,
        RecordKind::PlacedObject,
        RecordKind::HeadPart,
        RecordKind::Race,
        RecordKind::Cell,
        RecordKind::Npc,
        RecordKind::NavMesh,
    ];

    /// The registry a new session starts with: every builtin kind under
    /// its own signature.
    pub fn defaults() -> SubclassRegistry<RecordKind> {
        Self::BUILTIN
            .iter()
            .filter_map(|&kind| kind.signature().map(|s| (s, kind)))
            .collect()
    }

    /// The signature a builtin kind wraps. Custom kinds have none of their own.
    pub fn signature(&self) -> Option<Signature> {
        Some(match self {
            RecordKind::Armor => signatures::ARMO,
            RecordKind::ArmorAddon => signatures::ARMA,
            RecordKind::Global => signatures::GLOB,
            RecordKind::PlacedObject => signatures::REFR,
            RecordKind::HeadPart => signatures::HDPT,
            RecordKind::Race => signatures::RACE,
            RecordKind::Cell => signatures::CELL,
            RecordKind::Npc => signatures::NPC_,
            RecordKind::NavMesh => signatures::NAVM,
            RecordKind::Custom { .. } => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Armor => "Armor",
            RecordKind::ArmorAddon => "Armor Addon",
            RecordKind::Global => "Global",
            RecordKind::PlacedObject => "Placed Object",
            RecordKind::HeadPart => "Head Part",
            RecordKind::Race => "Race",
            RecordKind::Cell => "Cell",
            RecordKind::Npc => "Non-Player Character",
            RecordKind::NavMesh => "Navigation Mesh",
            RecordKind::Custom { name, .. } => *name,
        }
    }

    /// Attributes particular to this kind. Every record also has
    /// [`COMMON`].
    pub fn attributes(&self) -> &'static [Attribute] {
        match self {
            RecordKind::Armor => &ARMO,
            RecordKind::ArmorAddon => &ARMA,
            RecordKind::Global => &GLOB,
            RecordKind::PlacedObject => &REFR,
            RecordKind::HeadPart => &HDPT,
            RecordKind::Race => &RACE,
            RecordKind::Cell => &CELL,
            RecordKind::Npc => &NPC_,
            RecordKind::NavMesh => &NAVM,
            RecordKind::Custom { attributes, .. } => *attributes,
        }
    }

    /// Look `key` up in this kind's table, then in [`COMMON`].
    pub fn attribute(&self, key: &str) -> Option<&'static Attribute> {
        attribute::find(self.attributes(), key).or_else(|| attribute::find(&COMMON, key))
    }
}

// ============================================================================
// Attribute tables
// ============================================================================

const fn attr(name: &'static str, path: &'static str) -> Attribute {
    Attribute::new(name, path)
}

pub static COMMON: [Attribute; 2] = [
    attr("editor_id", "EDID"),
    attr("record_flags", "Record Header\\Record Flags").stored_as(Storage::Flags),
];

static ARMO: [Attribute; 28] = [
    attr("script_info", "VMAD").stored_as(Storage::Object),
    attr("object_bounds", "OBND").stored_as(Storage::Object),
    attr("full_name", "FULL").stored_as(Storage::Text),
    attr("enchantment", "EITM").stored_as(Storage::Reference).aliased(&["object_effect"]),
    attr("enchantment_amount", "EAMT").stored_as(Storage::Integer),
    attr("male_model", "MOD2").stored_as(Storage::Object),
    attr("male_inventory_image", "ICON"),
    attr("male_message_image", "MICO"),
    attr("female_model", "MOD4").stored_as(Storage::Object),
    attr("female_inventory_image", "ICO2"),
    attr("female_message_image", "MIC2"),
    attr("body_template_12byte", "BODT").stored_as(Storage::Object),
    attr("body_template", "BOD2").stored_as(Storage::Object),
    attr("destructible", "DEST").stored_as(Storage::Object).aliased(&["destruction_data"]),
    attr("pickup_sound", "YNAM").stored_as(Storage::Reference),
    attr("drop_sound", "ZNAM").stored_as(Storage::Reference),
    attr("ragdoll_constraint_template", "BMCT"),
    attr("equipment_type", "ETYP").stored_as(Storage::Reference).aliased(&["equipment_slot"]),
    attr("bash_impact_data_set", "BIDS").stored_as(Storage::Reference),
    attr("bash_material", "BAMT").stored_as(Storage::Reference).aliased(&["alternate_block_material"]),
    attr("race", "RNAM").stored_as(Storage::Reference),
    attr("keyword_count", "KSIZ").stored_as(Storage::Integer),
    attr("keywords", "KWDA").stored_as(Storage::Object),
    attr("description", "DESC").stored_as(Storage::Text),
    attr("armature", "MODL").stored_as(Storage::Object),
    attr("data", "DATA").stored_as(Storage::Object),
    attr("armor_rating", "DNAM").stored_as(Storage::Float),
    attr("template", "TNAM").stored_as(Storage::Reference).aliased(&["template_armor"]),
];

static ARMA: [Attribute; 15] = [
    attr("body_template_12byte", "BODT").stored_as(Storage::Object),
    attr("body_template", "BOD2").stored_as(Storage::Object),
    attr("race", "RNAM").stored_as(Storage::Reference),
    attr("data", "DNAM").stored_as(Storage::Object),
    attr("male_model", "MOD2").stored_as(Storage::Object),
    attr("male_firstperson_model", "MOD3").stored_as(Storage::Object),
    attr("female_model", "MOD4").stored_as(Storage::Object),
    attr("female_firstperson_model", "MOD5").stored_as(Storage::Object),
    attr("male_skin_texture", "NAM0").stored_as(Storage::Reference).aliased(&["base_male_texture"]),
    attr("female_skin_texture", "NAM1").stored_as(Storage::Reference).aliased(&["base_female_texture"]),
    attr("base_male_firstperson_texture", "NAM2").stored_as(Storage::Reference),
    attr("base_female_firstperson_texture", "NAM3").stored_as(Storage::Reference),
    attr("additional_races", "MODL").stored_as(Storage::Object).aliased(&["included_races"]),
    attr("footstep_sound", "SNDD").stored_as(Storage::Reference),
    attr("art_object", "ONAM").stored_as(Storage::Reference),
];

static GLOB: [Attribute; 2] = [attr("type", "FNAM"), attr("value", "FLTV").stored_as(Storage::Float)];

static REFR: [Attribute; 7] = [
    attr("data", "DATA").stored_as(Storage::Object),
    attr("position_x", "DATA\\Position\\X").stored_as(Storage::Float),
    attr("position_y", "DATA\\Position\\Y").stored_as(Storage::Float),
    attr("position_z", "DATA\\Position\\Z").stored_as(Storage::Float),
    attr("rotation_x", "DATA\\Rotation\\X").stored_as(Storage::Float),
    attr("rotation_y", "DATA\\Rotation\\Y").stored_as(Storage::Float),
    attr("rotation_z", "DATA\\Rotation\\Z").stored_as(Storage::Float),
];

pub const HEAD_PART_TYPES: [&str; 7] = ["Misc", "Face", "Eyes", "Hair", "Facial Hair", "Scar", "Eyebrows"];

static HDPT: [Attribute; 9] = [
    attr("full_name", "FULL").stored_as(Storage::Text),
    attr("model_filename", "Model\\MODL").stored_as(Storage::Text),
    attr("flags", "DATA").stored_as(Storage::Flags),
    attr("headpart_type", "PNAM").stored_as(Storage::Enum(&HEAD_PART_TYPES)),
    attr("extra_parts", "HNAM").stored_as(Storage::Object),
    attr("parts", "Parts").stored_as(Storage::Object),
    attr("texture_set", "TNAM").stored_as(Storage::Reference).aliased(&["base_texture"]),
    attr("color", "CNAM").stored_as(Storage::Reference),
    attr("valid_races", "RNAM").stored_as(Storage::Reference).aliased(&["resource_list"]),
];

static RACE: [Attribute; 2] = [
    attr("skin", "WNAM").stored_as(Storage::Reference),
    attr("keywords", "KWDA").stored_as(Storage::Object),
];

static CELL: [Attribute; 3] = [
    attr("water_height", "XCLW").stored_as(Storage::Float),
    attr("location", "XLCN").stored_as(Storage::Reference),
    attr("music_type", "XCMO").stored_as(Storage::Reference),
];

static NPC_: [Attribute; 50] = [
    attr("script_info", "VMAD").stored_as(Storage::Object),
    attr("object_bounds", "OBND").stored_as(Storage::Object),
    attr("base_stats", "ACBS").stored_as(Storage::Object),
    attr("factions", "SNAM").stored_as(Storage::Object),
    attr("death_item", "INAM").stored_as(Storage::Reference),
    attr("voice_type", "VTCK").stored_as(Storage::Reference),
    attr("template", "TPLT").stored_as(Storage::Reference),
    attr("race", "RNAM").stored_as(Storage::Reference),
    attr("spell_count", "SPCT").stored_as(Storage::Integer),
    attr("actor_effects", "SPLO").aliased(&["spell"]),
    attr("destructible", "DEST").stored_as(Storage::Object).aliased(&["destruction_data"]),
    attr("worn_armor", "WNAM").stored_as(Storage::Reference),
    attr("faraway_model", "ANAM").stored_as(Storage::Reference),
    attr("attack_race", "ATKR").stored_as(Storage::Reference),
    attr("attacks", "ATKD").stored_as(Storage::Object).aliased(&["attack_data"]),
    attr("ai_spectator_override", "SPOR").stored_as(Storage::Reference),
    attr("ai_observe_corpse", "OCOR").stored_as(Storage::Reference),
    attr("ai_guard_warn_override", "GWOR").stored_as(Storage::Reference),
    attr("ai_combat_override", "ECOR").stored_as(Storage::Reference),
    attr("perk_count", "PRKZ").stored_as(Storage::Integer),
    attr("perk_record", "PRKR").stored_as(Storage::Object),
    attr("items_count", "COCT").stored_as(Storage::Integer).aliased(&["container_count"]),
    attr("items", "CNTO").stored_as(Storage::Object).aliased(&["container"]),
    attr("ai_data", "AIDT").stored_as(Storage::Object),
    attr("ai_package", "PKID").stored_as(Storage::Reference),
    attr("keyword_count", "KSIZ").stored_as(Storage::Integer),
    attr("keywords", "KWDA").stored_as(Storage::Object),
    attr("class", "CNAM").stored_as(Storage::Reference),
    attr("full_name", "FULL").stored_as(Storage::Text),
    attr("short_name", "SHRT").stored_as(Storage::Text),
    attr("marker", "DATA"),
    attr("skills_and_stats", "DNAM").stored_as(Storage::Object),
    attr("head_parts", "PNAM").stored_as(Storage::Reference),
    attr("hair_color", "HCLF").stored_as(Storage::Reference),
    attr("combat_style", "ZNAM").stored_as(Storage::Reference),
    attr("gift_filter", "GNAM").stored_as(Storage::Reference),
    attr("height", "NAM6").stored_as(Storage::Float),
    attr("weight", "NAM7").stored_as(Storage::Float),
    attr("sound_level", "NAM8"),
    attr("sound_types", "CSDT").stored_as(Storage::Object),
    attr("audio_template", "CSCR").stored_as(Storage::Reference).aliased(&["inherits_sounds_from"]),
    attr("default_outfit", "DOFT").stored_as(Storage::Reference),
    attr("sleep_outfit", "SOFT").stored_as(Storage::Reference),
    attr("default_package_list", "DPLT").stored_as(Storage::Reference),
    attr("crime_faction", "CRIF").stored_as(Storage::Reference),
    attr("face_texture_set", "FTST").stored_as(Storage::Reference).aliased(&["head_texture"]),
    attr("skin_tone", "QNAM").stored_as(Storage::Object).aliased(&["texture_lighting"]),
    attr("face_morphs", "NAM9").stored_as(Storage::Object),
    attr("face_parts", "NAMA").stored_as(Storage::Object),
    attr("tint_layers", "TINI").stored_as(Storage::Object),
];

static NAVM: [Attribute; 1] = [attr("geometry", "NVNM").stored_as(Storage::Object)];

// ============================================================================
// Record
// ============================================================================

/// A main record of a registered kind.
#[derive(Debug, Clone)]
pub struct Record<'s> {
    element: Element<'s>,
    kind: RecordKind,
}

element_wrapper!(Record);

impl<'s> Record<'s> {
    pub(crate) fn new(element: Element<'s>, kind: RecordKind) -> Self {
        Self { element, kind }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    fn attribute(&self, key: &str) -> XEditResult<&'static Attribute> {
        match self.kind.attribute(key) {
            Some(attribute) => Ok(attribute),
            None => Err(XEditError::schema(self.handle()?, key)),
        }
    }

    /// Read the attribute named `key`. `None` when the field is absent.
    pub fn attr(&self, key: &str) -> XEditResult<Option<Entry<'s>>> {
        attribute::read(self, self.attribute(key)?)
    }

    /// Read the attribute named `key` as a plain value.
    pub fn attr_value(&self, key: &str) -> XEditResult<Option<Value>> {
        self.value(self.attribute(key)?.path)
    }

    pub fn set_attr(&self, key: &str, value: impl Into<Value>) -> XEditResult<()> {
        attribute::write(self, self.attribute(key)?, Some(value.into()))
    }

    /// Remove the field behind `key`.
    pub fn clear_attr(&self, key: &str) -> XEditResult<()> {
        attribute::write(self, self.attribute(key)?, None)
    }

    pub fn editor_id(&self) -> XEditResult<Option<String>> {
        Ok(self.attr_value("editor_id")?.and_then(|v| v.as_str().map(str::to_string)))
    }

    pub fn set_editor_id(&self, editor_id: &str) -> XEditResult<()> {
        self.set_attr("editor_id", editor_id)
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Whether this is the original definition rather than an override.
    pub fn is_master(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().is_master(handle)
    }

    pub fn is_override(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().is_override(handle)
    }

    pub fn is_injected(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().is_injected(handle)
    }

    pub fn is_winning_override(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().is_winning_override(handle)
    }

    /// The original definition this record overrides, or itself.
    pub fn master_record(&self) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let master = self.session().bridge().get_master_record(handle)?;
        self.session().objectify(master)
    }

    /// The version that wins in the current load order.
    pub fn winning_override(&self) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let winner = self.session().bridge().get_winning_override(handle)?;
        self.session().objectify(winner)
    }

    pub fn overrides(&self) -> XEditResult<Vec<Object<'s>>> {
        let handle = self.handle()?;
        let handles = self.session().bridge().get_overrides(handle)?;
        self.session().objectify_all(handles)
    }

    /// Records that reference this one.
    pub fn referenced_by(&self) -> XEditResult<Vec<Object<'s>>> {
        let handle = self.handle()?;
        let handles = self.session().bridge().get_referenced_by(handle)?;
        self.session().objectify_all(handles)
    }

    // ========================================================================
    // Kind-specific views
    // ========================================================================

    fn expect_kind(&self, kind: RecordKind) -> XEditResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(XEditError::invariant(format!(
                "{} is a {} record, not a {}",
                self.describe(),
                self.kind.name(),
                kind.name()
            )))
        }
    }

    fn coordinates(&self, keys: [&str; 3]) -> XEditResult<[f64; 3]> {
        let mut out = [0.0; 3];
        for (slot, key) in out.iter_mut().zip(keys) {
            *slot = self
                .attr_value(key)?
                .and_then(|v| v.as_f64())
                .ok_or_else(|| XEditError::invariant(format!("{} has no numeric {key}", self.describe())))?;
        }
        Ok(out)
    }

    fn set_coordinates(&self, keys: [&str; 3], values: [f64; 3]) -> XEditResult<()> {
        for (key, value) in keys.into_iter().zip(values) {
            self.set_attr(key, value)?;
        }
        Ok(())
    }

    /// Placed object position, `[x, y, z]`.
    pub fn position(&self) -> XEditResult<[f64; 3]> {
        self.expect_kind(RecordKind::PlacedObject)?;
        self.coordinates(["position_x", "position_y", "position_z"])
    }

    pub fn set_position(&self, position: [f64; 3]) -> XEditResult<()> {
        self.expect_kind(RecordKind::PlacedObject)?;
        self.set_coordinates(["position_x", "position_y", "position_z"], position)
    }

    /// Placed object rotation, `[x, y, z]`.
    pub fn rotation(&self) -> XEditResult<[f64; 3]> {
        self.expect_kind(RecordKind::PlacedObject)?;
        self.coordinates(["rotation_x", "rotation_y", "rotation_z"])
    }

    pub fn set_rotation(&self, rotation: [f64; 3]) -> XEditResult<()> {
        self.expect_kind(RecordKind::PlacedObject)?;
        self.set_coordinates(["rotation_x", "rotation_y", "rotation_z"], rotation)
    }

    /// Persistent references of a cell.
    pub fn persistent(&self) -> XEditResult<Option<Object<'s>>> {
        self.cell_group("Persistent")
    }

    /// Temporary references of a cell.
    pub fn temporary(&self) -> XEditResult<Option<Object<'s>>> {
        self.cell_group("Temporary")
    }

    fn cell_group(&self, name: &str) -> XEditResult<Option<Object<'s>>> {
        self.expect_kind(RecordKind::Cell)?;
        let Some(group) = self.child_group()? else {
            return Ok(None);
        };
        let found = group.lookup(name);
        group.release()?;
        found
    }

    /// Model items of an armor addon that are present, male before female.
    pub fn models(&self) -> XEditResult<Vec<Object<'s>>> {
        self.expect_kind(RecordKind::ArmorAddon)?;
        self.present(&["MOD2", "MOD3", "MOD4", "MOD5"])
    }

    /// Skin texture references of an armor addon that are present.
    pub fn textures(&self) -> XEditResult<Vec<Object<'s>>> {
        self.expect_kind(RecordKind::ArmorAddon)?;
        self.present(&["NAM0", "NAM1", "NAM2", "NAM3"])
    }

    fn present(&self, paths: &[&str]) -> XEditResult<Vec<Object<'s>>> {
        let mut out = Vec::new();
        for path in paths {
            out.extend(self.lookup(path)?);
        }
        Ok(out)
    }

    /// Mesh files this record points at, relative to the data directory.
    ///
    /// Head parts list their model and every part file, sorted without
    /// duplicates. Armor addons list each present model's file name.
    pub fn file_paths(&self) -> XEditResult<Vec<String>> {
        match self.kind {
            RecordKind::HeadPart => self.head_part_files(),
            RecordKind::ArmorAddon => self.armature_files(),
            other => Err(XEditError::invariant(format!(
                "{} records do not reference mesh files",
                other.name()
            ))),
        }
    }

    fn head_part_files(&self) -> XEditResult<Vec<String>> {
        let mut files = BTreeSet::new();
        if let Some(model) = self.text_at("Model\\MODL")? {
            files.insert(format!("Meshes\\{model}"));
        }
        if let Some(parts) = self.lookup("Parts")? {
            for part in parts.children()? {
                let file = part.value("NAM1");
                part.release()?;
                if let Some(file) = file?.map(|v| v.to_string()).filter(|f| !f.is_empty()) {
                    files.insert(format!("Meshes\\{file}"));
                }
            }
            parts.release()?;
        }
        Ok(files.into_iter().collect())
    }

    fn armature_files(&self) -> XEditResult<Vec<String>> {
        let mut files = Vec::new();
        for n in 2..=5 {
            if let Some(file) = self.text_at(&format!("MOD{n}\\MOD{n}"))? {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn text_at(&self, path: &str) -> XEditResult<Option<String>> {
        Ok(self
            .value(path)?
            .map(|v| v.to_string())
            .filter(|s| !s.is_empty()))
    }
}
