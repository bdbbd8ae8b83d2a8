//! This module aggregates various utility submodules used throughout the application.

/// Client for the song lookup API and the audio storage host.
pub mod song_lookup;
