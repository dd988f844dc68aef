use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::observer::context::HookContext;
use crate::observer::error::ObserverError;
use crate::store::{Collection, Entity};

/// Points in the controller lifecycle where observers are notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    BeforeFilter,
    ExtendIndex,
    ExtendList,
    BeforeShow,
    ExtendShow,
    BeforeSave,
    AfterSave,
    BeforeDestroy,
}

/// Base trait for all observers with metadata and applicability checks
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Check if observer applies to this resource
    fn applies_to_resource(&self, _resource: &str) -> bool {
        true
    }

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Lower numbers execute first
    fn priority(&self) -> u8 {
        50
    }
}

/// Contributes extra filters; returned maps are merged in observer order
#[async_trait]
pub trait BeforeFilterObserver: Observer {
    async fn execute(
        &self,
        ctx: &HookContext,
        filters: &Map<String, Value>,
    ) -> Result<Option<Map<String, Value>>, ObserverError>;
}

#[async_trait]
pub trait ExtendIndexObserver: Observer {
    async fn execute(&self, ctx: &HookContext, collection: &mut dyn Collection) -> Result<(), ObserverError>;
}

#[async_trait]
pub trait ExtendListObserver: Observer {
    async fn execute(&self, ctx: &HookContext, collection: &mut dyn Collection) -> Result<(), ObserverError>;
}

/// May rewrite the identifier before it is resolved
#[async_trait]
pub trait BeforeShowObserver: Observer {
    async fn execute(&self, ctx: &HookContext, identifier: &mut Value) -> Result<(), ObserverError>;
}

#[async_trait]
pub trait ExtendShowObserver: Observer {
    async fn execute(&self, ctx: &HookContext, entity: &mut Entity) -> Result<(), ObserverError>;
}

/// May rewrite the normalized input before validation
#[async_trait]
pub trait BeforeSaveObserver: Observer {
    async fn execute(
        &self,
        ctx: &HookContext,
        entity: &Entity,
        data: &mut Map<String, Value>,
    ) -> Result<(), ObserverError>;
}

#[async_trait]
pub trait AfterSaveObserver: Observer {
    async fn execute(
        &self,
        ctx: &HookContext,
        entity: &Entity,
        data: &Map<String, Value>,
    ) -> Result<(), ObserverError>;
}

#[async_trait]
pub trait BeforeDestroyObserver: Observer {
    async fn execute(&self, ctx: &HookContext, entity: &Entity) -> Result<(), ObserverError>;
}

/// Concrete observer types for dynamic dispatch
pub enum ObserverBox {
    BeforeFilter(Box<dyn BeforeFilterObserver>),
    ExtendIndex(Box<dyn ExtendIndexObserver>),
    ExtendList(Box<dyn ExtendListObserver>),
    BeforeShow(Box<dyn BeforeShowObserver>),
    ExtendShow(Box<dyn ExtendShowObserver>),
    BeforeSave(Box<dyn BeforeSaveObserver>),
    AfterSave(Box<dyn AfterSaveObserver>),
    BeforeDestroy(Box<dyn BeforeDestroyObserver>),
}

macro_rules! each_observer {
    ($self:expr, $o:ident => $body:expr) => {
        match $self {
            ObserverBox::BeforeFilter($o) => $body,
            ObserverBox::ExtendIndex($o) => $body,
            ObserverBox::ExtendList($o) => $body,
            ObserverBox::BeforeShow($o) => $body,
            ObserverBox::ExtendShow($o) => $body,
            ObserverBox::BeforeSave($o) => $body,
            ObserverBox::AfterSave($o) => $body,
            ObserverBox::BeforeDestroy($o) => $body,
        }
    };
}

impl ObserverBox {
    pub fn point(&self) -> ExtensionPoint {
        match self {
            ObserverBox::BeforeFilter(_) => ExtensionPoint::BeforeFilter,
            ObserverBox::ExtendIndex(_) => ExtensionPoint::ExtendIndex,
            ObserverBox::ExtendList(_) => ExtensionPoint::ExtendList,
            ObserverBox::BeforeShow(_) => ExtensionPoint::BeforeShow,
            ObserverBox::ExtendShow(_) => ExtensionPoint::ExtendShow,
            ObserverBox::BeforeSave(_) => ExtensionPoint::BeforeSave,
            ObserverBox::AfterSave(_) => ExtensionPoint::AfterSave,
            ObserverBox::BeforeDestroy(_) => ExtensionPoint::BeforeDestroy,
        }
    }

    pub fn name(&self) -> &'static str {
        each_observer!(self, o => o.name())
    }

    pub fn applies_to_resource(&self, resource: &str) -> bool {
        each_observer!(self, o => o.applies_to_resource(resource))
    }

    pub fn timeout(&self) -> Duration {
        each_observer!(self, o => o.timeout())
    }

    pub fn priority(&self) -> u8 {
        each_observer!(self, o => o.priority())
    }
}
