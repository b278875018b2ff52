//! Shared fixture: three loaded plugins and a few Skyrim records on the
//! in-memory engine.

#![allow(dead_code)]

use std::time::Duration;

use xedit::{GameMode, Session, SessionConfig};
use xedit_core::Color;
use xedit_ffi::MockEngine;
use xedit_ffi::mock::{NodeId, NodeSpec};

pub const HELMET: &str = "Skyrim.esm\\ARMO\\00012E46";
pub const KEYWORD_ID: u32 = 0x0006_BBD8;
pub const FIRST_PERSON: [&str; 4] = ["Head", "Hair", "Body", "Hands"];

pub struct Fixture {
    pub engine: MockEngine,
    pub skyrim: NodeId,
    pub update: NodeId,
    pub patch: NodeId,
    pub helmet: NodeId,
    pub keyword: NodeId,
}

pub fn config() -> SessionConfig {
    SessionConfig::new(GameMode::SkyrimSE).with_poll_interval(Duration::ZERO)
}

pub fn fixture() -> Fixture {
    let engine = MockEngine::new();
    let skyrim = engine.add_plugin("Skyrim.esm");
    let update = engine.add_plugin("Update.esm");
    let patch = engine.add_plugin("Patch.esp");

    let keyword = engine.add_record(skyrim, "KYWD", engine.form_id(skyrim, KEYWORD_ID), "ArmorHelmet");
    let helmet = engine.add_record(skyrim, "ARMO", engine.form_id(skyrim, 0x12E46), "ArmorIronHelmet");
    engine.add_child(helmet, NodeSpec::string("FULL", "Iron Helmet"));
    engine.add_child(helmet, NodeSpec::float("DNAM", 15.0));
    engine.add_child(
        helmet,
        NodeSpec::structure(
            "BOD2",
            vec![NodeSpec::flags("First Person Flags", &FIRST_PERSON, &["Head", "Hair"])],
        ),
    );
    engine.add_child(
        helmet,
        NodeSpec::sorted_array(
            "KWDA",
            NodeSpec::reference("Keyword", 0),
            vec![NodeSpec::reference("Keyword", KEYWORD_ID)],
        ),
    );
    engine.add_child(helmet, NodeSpec::color("CNAM", Color::new(10, 20, 30)));
    engine.add_child(helmet, NodeSpec::string("OBND", "").removable(false));
    engine.allow_child(helmet, NodeSpec::string("DESC", ""));
    engine.allow_child(helmet, NodeSpec::reference("EITM", 0));

    Fixture {
        engine,
        skyrim,
        update,
        patch,
        helmet,
        keyword,
    }
}

impl Fixture {
    pub fn open(&self) -> Session {
        Session::open(config(), self.engine.clone()).unwrap()
    }
}
