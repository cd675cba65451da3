//! Entities stored by the intranet notification bot.

pub mod activity;
pub mod event;
pub mod hash;
pub mod location;
pub mod module;

pub use activity::Activity;
pub use event::Event;
pub use location::{Location, LocationType};
pub use module::{Module, ModuleFlag, ModuleFlags, Promo};

use intra_orm::registry;

/// Register every entity of this crate. Call once before any database access.
pub fn register_all() {
    registry::register::<Module>();
    registry::register::<ModuleFlag>();
    registry::register::<Location>();
    registry::register::<LocationType>();
    registry::register::<Activity>();
    registry::register::<Event>();
}

/// Names of the tables registered by [`register_all`], in registration order.
pub const TABLES: [&str; 6] = [
    "modules",
    "module_flags",
    "locations",
    "locations_types",
    "activities",
    "events",
];

/// Declares a string-backed enum stored as its label.
macro_rules! string_column {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )*
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)*
                    other => Err(format!("unknown {} `{other}`", stringify!($name))),
                }
            }
        }

        impl ::intra_orm::entity::column::ColumnType for $name {
            const KIND: ::intra_orm::value::ValueKind = ::intra_orm::value::ValueKind::String;

            fn to_value(&self) -> ::intra_orm::Value {
                ::intra_orm::Value::from(self.as_str())
            }

            fn from_value(value: ::intra_orm::Value) -> Result<Self, String> {
                match value {
                    ::intra_orm::Value::String(e) => e.parse(),
                    other => Err(format!("expected a string, got {other:?}")),
                }
            }
        }
    };
}

pub(crate) use string_column;
