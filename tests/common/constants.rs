//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When fixture data changes (credentials, release IDs, etc.),
//! update only this file.

// ============================================================================
// Upstream Credentials
// ============================================================================

/// Personal access token accepted by the mock upstream
pub const TEST_TOKEN: &str = "test-token-123";

/// Collection owner known to the mock upstream
pub const TEST_USERNAME: &str = "crate-digger";

/// Folder holding every release
pub const TEST_FOLDER: &str = "0";

/// API key accepted by the mock favorites store
pub const TEST_FAVORITES_KEY: &str = "favorites-key-456";

// ============================================================================
// Fixture Release IDs
// ============================================================================

/// "The Dark Side of the Moon" by Pink Floyd (1973, Stereo)
pub const RELEASE_DARK_SIDE_ID: &str = "1001";
pub const RELEASE_DARK_SIDE_TITLE: &str = "The Dark Side of the Moon";

/// "Kind of Blue" by Miles Davis (1959, Mono)
pub const RELEASE_KIND_OF_BLUE_ID: &str = "1002";
pub const RELEASE_KIND_OF_BLUE_TITLE: &str = "Kind of Blue";

/// "A Love Supreme" by John Coltrane (1965)
pub const RELEASE_LOVE_SUPREME_ID: &str = "1003";

/// "Autobahn" by Kraftwerk (1974)
pub const RELEASE_AUTOBAHN_ID: &str = "1004";

/// "Discovery" by Daft Punk (2001, CD)
pub const RELEASE_DISCOVERY_ID: &str = "1005";

/// "Pink Moon" by Nick Drake (1972)
pub const RELEASE_PINK_MOON_ID: &str = "1006";

/// "Bootleg Tapes" by Various, undated cassette without label
pub const RELEASE_BOOTLEG_ID: &str = "1007";

/// Number of releases in the fixture collection
pub const FIXTURE_RELEASE_COUNT: usize = 7;

/// Page size used by the test server, splits the fixture into 3 pages
pub const TEST_PER_PAGE: u32 = 3;

/// Pages needed for the fixture collection at TEST_PER_PAGE
pub const FIXTURE_PAGE_COUNT: u32 = 3;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Maximum time to wait for a sync to settle (milliseconds)
pub const SYNC_SETTLE_TIMEOUT_MS: u64 = 5000;

/// HTTP request timeout (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
