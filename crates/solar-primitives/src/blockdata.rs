/// Block-related data structures and functionality.
pub mod block;

/// Block locators used to negotiate a common chain point with peers.
pub mod locator;

/// Transaction-related data structures and functionality.
pub mod transaction;
