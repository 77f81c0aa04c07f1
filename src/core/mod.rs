pub mod chronicle;
pub mod game;
pub mod institution;
pub mod lab;
pub mod stats;
pub mod world;

pub use crate::domain::model::{AgentRecord, Allegiance, PublicRecord, Sanctions};
pub use crate::domain::ports::{Game, Recorder, Storage, Strategy};
pub use crate::utils::error::Result;
pub use chronicle::Chronicle;
pub use game::LinearPublicGoods;
pub use lab::{summarize, LabEngine};
pub use stats::{Evaluation, ExperimentStatistics, RoundStatistics};
pub use world::{Participant, SessionParams, SessionSetup, World, WorldView};
