pub mod kickoff;

pub use kickoff::{
    codex_autocommand, projects_database_request, CodexAction, Kickoff, KickoffConfig,
    KickoffReport, ProjectKickoff, SoraError, SoraPayload, SoraSync,
};
