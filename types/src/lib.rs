pub mod assignments;
pub mod clock;
pub mod config;
pub mod containers;
pub mod nonstandard;
pub mod primitives;
pub mod redacting_url;
