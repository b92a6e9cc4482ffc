//! Horizon Trellis - a class/mixin object model with debounced scheduling
//! and remote-data collections.
//!
//! This is the main umbrella crate that re-exports all public APIs.
//!
//! # Example
//!
//! ```
//! use horizon_trellis::{ClassBuilder, Instance, MemberTable, MethodReturn, Runtime, Variant};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::new();
//!     let class = ClassBuilder::new("Greeter")
//!         .members(MemberTable::new().with_method("greet", |instance, _args| {
//!             let name = instance.get("name").into_text().unwrap_or_default();
//!             Ok(MethodReturn::Value(Variant::from(format!("hello, {name}"))))
//!         }))
//!         .build(&runtime)?;
//!
//!     let greeter = Instance::create(class);
//!     greeter.set("name", "trellis");
//!     let reply = greeter.call("greet", &[])?;
//!     Ok(())
//! }
//! ```

pub use horizon_trellis_core::*;

/// Remote-data module.
pub mod data {
    pub use horizon_trellis_data::*;
}

pub mod prelude;
