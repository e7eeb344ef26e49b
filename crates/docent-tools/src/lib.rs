//! Tool executor trait and the retrieval tool the agent calls.

pub mod executor;
pub mod registry;
pub mod retrieve;

pub use executor::{
    MAX_TOOL_OUTPUT_CHARS, ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params,
    extract_fenced_blocks, truncate_tool_output,
};
pub use registry::{TOOL_CALL_TAG, ToolDef, ToolRegistry};
pub use retrieve::{DEFAULT_TOP_K, NO_RESULTS_MESSAGE, RetrievalExecutor, RetrieveParams};
