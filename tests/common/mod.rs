//! Integration test common infrastructure.
//!
//! Provides a shared roster, utilities for spawning test servers, and a
//! line-protocol test client.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;

/// Scope used by every test.
#[allow(dead_code)]
pub const LOBBY: u64 = 1;
#[allow(dead_code)]
pub const OWNER: u64 = 1;
#[allow(dead_code)]
pub const MANAGER: u64 = 2;
#[allow(dead_code)]
pub const ALICE: u64 = 10;
/// Young account that refuses direct messages.
#[allow(dead_code)]
pub const BOB: u64 = 11;
#[allow(dead_code)]
pub const CAROL: u64 = 12;
/// Known user who is not a member of the lobby.
#[allow(dead_code)]
pub const DAVE: u64 = 13;
#[allow(dead_code)]
pub const VIP_ROLE: u64 = 100;

/// Directory contents shared by library and gateway tests.
#[allow(dead_code)]
pub const ROSTER: &str = r#"
[[users]]
id = 1
name = "owner"
created_at = "2016-01-01T00:00:00Z"

[[users]]
id = 2
name = "moderator"
created_at = "2016-01-01T00:00:00Z"

[[users]]
id = 10
name = "alice"
created_at = "2019-05-01T00:00:00Z"
badges = ["early_supporter"]

[[users]]
id = 11
name = "bob"
created_at = "2024-12-20T00:00:00Z"
accepts_dms = false

[[users]]
id = 12
name = "carol"
created_at = "2019-05-01T00:00:00Z"

[[users]]
id = 13
name = "dave"
created_at = "2019-05-01T00:00:00Z"

[[scopes]]
id = 1
name = "Lobby"
created_at = "2018-01-01T00:00:00Z"
managers = [2]
roles = [{ id = 100, name = "VIP" }]
members = [
    { user = 1, joined_at = "2018-01-01T00:00:00Z" },
    { user = 2, joined_at = "2018-01-01T00:00:00Z" },
    { user = 10, joined_at = "2019-06-01T00:00:00Z", roles = [100] },
    { user = 11, joined_at = "2024-12-25T00:00:00Z" },
    { user = 12, joined_at = "2020-01-01T00:00:00Z", nick = "caz" },
]
"#;
