/// Shared limits and endpoint constants used across the pipeline.

/// Maximum number of hashes accepted in a single batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Minimum length for a well-formed hardware hash.
pub const DEFAULT_MIN_HASH_LENGTH: usize = 20;

/// Maximum input file size accepted by the CLI (5 MiB).
pub const MAX_INPUT_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Remote error bodies are truncated to this many characters before they are
/// embedded in outcome messages.
pub const ERROR_DETAIL_MAX_CHARS: usize = 500;

/// Invalid-hash examples quoted in issue messages are clipped to this length.
pub const EXAMPLE_VALUE_MAX_CHARS: usize = 30;

/// Number of leading hash characters used for the placeholder serial number.
pub const SERIAL_PREFIX_CHARS: usize = 10;

// Header keywords used to recognize a tabular export (e.g. AutopilotHWID.csv,
// header "Device Serial Number,Windows Product ID,Hardware Hash").
pub const SERIAL_HEADER_KEYWORD: &str = "serial";
pub const HASH_HEADER_KEYWORD: &str = "hash";

/// Zero-based column holding the hardware hash in tabular exports.
pub const HASH_COLUMN_INDEX: usize = 2;

// Microsoft identity platform / Graph endpoints.
pub const TOKEN_ENDPOINT_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";
pub const IMPORT_ENDPOINT: &str =
    "https://graph.microsoft.com/v1.0/deviceManagement/importedWindowsAutopilotDeviceIdentities/import";
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// OData type attached to each imported device identity.
pub const IMPORTED_DEVICE_ODATA_TYPE: &str =
    "#microsoft.graph.importedWindowsAutopilotDeviceIdentity";

pub fn token_endpoint_for_tenant(tenant_id: &str) -> String {
    TOKEN_ENDPOINT_TEMPLATE.replace("{tenant}", tenant_id)
}
