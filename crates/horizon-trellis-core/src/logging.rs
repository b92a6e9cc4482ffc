//! Logging and debugging facilities for Horizon Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Use [`RuntimeDebug`] to get a human-readable dump of everything a
//! runtime has registered:
//!
//! ```ignore
//! use horizon_trellis_core::logging::RuntimeDebug;
//!
//! println!("{}", RuntimeDebug::new(&runtime).format());
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::runtime::Runtime;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_trellis_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_trellis_core::signal";
    /// Property system target.
    pub const PROPERTY: &str = "horizon_trellis_core::property";
    /// Mixin registry target.
    pub const MIXIN: &str = "horizon_trellis_core::mixin";
    /// Class and instance target.
    pub const CLASS: &str = "horizon_trellis_core::class";
    /// Singleton registry target.
    pub const SINGLETON: &str = "horizon_trellis_core::singleton";
    /// Debounce scheduler target.
    pub const SOON: &str = "horizon_trellis_core::soon";
    /// Runtime registries target.
    pub const RUNTIME: &str = "horizon_trellis_core::runtime";
}

/// Configuration for runtime debug dumps.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Whether to list each class's member names.
    pub show_members: bool,
    /// Whether to show each class's superclass and mixins.
    pub show_ancestry: bool,
    /// Indent size for nested lines.
    pub indent_size: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            show_members: false,
            show_ancestry: true,
            indent_size: 2,
        }
    }
}

impl DumpOptions {
    /// Options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_members: true,
            ..Default::default()
        }
    }

    /// Options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_members: false,
            show_ancestry: false,
            ..Default::default()
        }
    }
}

/// Debug utility for dumping a runtime's registries.
pub struct RuntimeDebug<'a> {
    runtime: &'a Runtime,
    options: DumpOptions,
}

impl<'a> RuntimeDebug<'a> {
    /// Create a dumper with default options.
    pub fn new(runtime: &'a Runtime) -> Self {
        Self {
            runtime,
            options: DumpOptions::default(),
        }
    }

    /// Create a dumper with custom options.
    pub fn with_options(runtime: &'a Runtime, options: DumpOptions) -> Self {
        Self { runtime, options }
    }

    /// Format every registry into a human-readable listing.
    pub fn format(&self) -> String {
        let indent = " ".repeat(self.options.indent_size);
        let mut output = String::new();

        writeln!(
            output,
            "Runtime ({} classes, {} mixins, {} singletons, {} constructors):",
            self.runtime.classes().len(),
            self.runtime.mixins().len(),
            self.runtime.singletons().len(),
            self.runtime.constructors().len(),
        )
        .expect("write to String");

        let mut class_names = self.runtime.classes().names();
        class_names.sort();
        if class_names.is_empty() {
            writeln!(output, "{indent}(no classes)").expect("write to String");
        }
        for name in class_names {
            let Some(class) = self.runtime.classes().get(&name) else {
                continue;
            };
            write!(output, "{indent}{name}").expect("write to String");
            if self.options.show_ancestry {
                if let Some(sup) = class.superclass() {
                    write!(output, " : {}", sup.name()).expect("write to String");
                }
                if !class.mixin_names().is_empty() {
                    write!(output, " +[{}]", class.mixin_names().join(", "))
                        .expect("write to String");
                }
            }
            output.push('\n');
            if self.options.show_members {
                for (member_name, member) in class.members().iter() {
                    let kind = if member.is_method() { "fn" } else { "data" };
                    writeln!(output, "{indent}{indent}.{member_name} ({kind})")
                        .expect("write to String");
                }
            }
        }

        output
    }
}

impl fmt::Display for RuntimeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Wrappers around the `tracing` macros with consistent target naming.
#[macro_export]
macro_rules! trellis_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_trellis_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! trellis_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_trellis_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! trellis_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_trellis_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! trellis_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_trellis_core", $($arg)*)
    };
}
