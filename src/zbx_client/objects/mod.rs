//! Typed wrappers over the Zabbix `*.get`, `*.create` and `*.delete` methods.
//!
//! Each entity module decodes into a private raw row with lenient string
//! fields and converts it into the public type, so a bad value is reported
//! with the entity, row index and field.

pub mod action;
pub mod alert;
pub mod event;
pub mod history;
pub mod host;
pub mod hostgroup;
pub mod hostinterface;
pub mod item;
pub mod maintenance;
pub mod problem;
pub mod proxy;
pub mod trigger;
pub mod usermacro;

pub use action::{Action, ActionGetParams, EvaluationType};
pub use alert::{Alert, AlertGetParams, AlertType};
pub use event::{Event, EventGetParams, EventObject, EventSource, TriggerValue};
pub use history::{History, HistoryGetParams};
pub use host::{
    Availability, Host, HostGetParams, HostStatus, InventoryMode, ObjectOrigin, TlsMode,
};
pub use hostgroup::{Hostgroup, HostgroupGetParams};
pub use hostinterface::{HostInterface, HostInterfaceGetParams, InterfaceType};
pub use item::{Item, ItemGetParams, ValueType};
pub use maintenance::{
    Maintenance, MaintenanceCreateParams, MaintenanceGetParams, MaintenanceType, TagEvaluation,
    TimePeriod, TimePeriodType,
};
pub use problem::{Problem, ProblemGetParams};
pub use proxy::{Proxy, ProxyCreateParams, ProxyGetParams, ProxyInterface, ProxyMode};
pub use trigger::{Trigger, TriggerGetParams, TriggerState};
pub use usermacro::{UserMacro, UserMacroGetParams};
