//! # Domains
//!
//! A domain is an entity category (persons, polygons, the simulation
//! itself, ...) that owns one command id per role:
//!
//! ```text
//!            get   set   subscribe   sub-response   context   ctx-response
//! person     0xAE  0xCE  0xDE        0xEE           0x8E      0x9E
//! misc       0xAC  0xCC  0xDC        0xEC           0x8C      0x9C
//! simulation 0xAB  0xCB  0xDB        0xEB           0x8B      0x9B
//! polygon    0xA8  0xC8  0xD8        0xE8           0x88      0x98
//! control    0xAD  0xCD  0xDD        0xED           0x8D      0x9D
//! ```
//!
//! The [`DomainRegistry`] maps every one of those ids back to its domain.
//! Get responses are always `get + 0x10` and are not registered.

mod control;
mod handle;
mod misc;
mod person;
mod polygon;
mod simulation;

pub use control::ControlApi;
pub use handle::DomainHandle;
pub use misc::MiscApi;
pub use person::PersonApi;
pub use polygon::PolygonApi;
pub use simulation::SimulationApi;

use std::collections::HashMap;

use crowdctl_wire::constants::{
    CMD_GET_CONTROL_VARIABLE, CMD_GET_MISC_VARIABLE, CMD_GET_PERSON_VARIABLE,
    CMD_GET_POLYGON_VARIABLE, CMD_GET_SIM_VARIABLE, CMD_SET_CONTROL_VARIABLE,
    CMD_SET_MISC_VARIABLE, CMD_SET_PERSON_VARIABLE, CMD_SET_POLYGON_VARIABLE,
    CMD_SET_SIM_VARIABLE, CMD_SUBSCRIBE_CONTROL_CONTEXT, CMD_SUBSCRIBE_CONTROL_VARIABLE,
    CMD_SUBSCRIBE_MISC_CONTEXT, CMD_SUBSCRIBE_MISC_VARIABLE, CMD_SUBSCRIBE_PERSON_CONTEXT,
    CMD_SUBSCRIBE_PERSON_VARIABLE, CMD_SUBSCRIBE_POLYGON_CONTEXT,
    CMD_SUBSCRIBE_POLYGON_VARIABLE, CMD_SUBSCRIBE_SIM_CONTEXT, CMD_SUBSCRIBE_SIM_VARIABLE,
    RESPONSE_OFFSET,
};

use crowdctl_wire::{TypeTag, TypedValue, WireError};

use crate::error::{ControlError, ControlResult};

/// Role a command id plays within its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandRole {
    /// Read one variable.
    Get,
    /// Write one variable.
    Set,
    /// Subscribe to variables.
    Subscribe,
    /// Result of a variable subscription.
    SubscribeResponse,
    /// Subscribe to the context of an object.
    Context,
    /// Result of a context subscription.
    ContextResponse,
}

/// An entity category and the command ids it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Domain {
    /// Name used in logs.
    pub name: &'static str,
    /// Get command id.
    pub get: u8,
    /// Set command id.
    pub set: u8,
    /// Subscribe command id.
    pub subscribe: u8,
    /// Subscribe response id.
    pub subscribe_response: u8,
    /// Context subscribe command id.
    pub context: u8,
    /// Context subscribe response id.
    pub context_response: u8,
}

impl Domain {
    /// Pedestrians.
    pub const PERSON: Self = Self::new(
        "person",
        CMD_GET_PERSON_VARIABLE,
        CMD_SET_PERSON_VARIABLE,
        CMD_SUBSCRIBE_PERSON_VARIABLE,
        CMD_SUBSCRIBE_PERSON_CONTEXT,
    );

    /// Miscellaneous objects: targets, stimuli, dissemination.
    pub const MISC: Self = Self::new(
        "misc",
        CMD_GET_MISC_VARIABLE,
        CMD_SET_MISC_VARIABLE,
        CMD_SUBSCRIBE_MISC_VARIABLE,
        CMD_SUBSCRIBE_MISC_CONTEXT,
    );

    /// Simulation globals.
    pub const SIMULATION: Self = Self::new(
        "simulation",
        CMD_GET_SIM_VARIABLE,
        CMD_SET_SIM_VARIABLE,
        CMD_SUBSCRIBE_SIM_VARIABLE,
        CMD_SUBSCRIBE_SIM_CONTEXT,
    );

    /// Polygons of the topography.
    pub const POLYGON: Self = Self::new(
        "polygon",
        CMD_GET_POLYGON_VARIABLE,
        CMD_SET_POLYGON_VARIABLE,
        CMD_SUBSCRIBE_POLYGON_VARIABLE,
        CMD_SUBSCRIBE_POLYGON_CONTEXT,
    );

    /// Control channel: scenario files and simulation state.
    pub const CONTROL: Self = Self::new(
        "control",
        CMD_GET_CONTROL_VARIABLE,
        CMD_SET_CONTROL_VARIABLE,
        CMD_SUBSCRIBE_CONTROL_VARIABLE,
        CMD_SUBSCRIBE_CONTROL_CONTEXT,
    );

    /// Every built-in domain.
    pub const BUILTIN: [Self; 5] = [
        Self::PERSON,
        Self::MISC,
        Self::SIMULATION,
        Self::POLYGON,
        Self::CONTROL,
    ];

    /// Creates a domain whose response ids follow the `+0x10` convention.
    #[must_use]
    pub const fn new(name: &'static str, get: u8, set: u8, subscribe: u8, context: u8) -> Self {
        Self {
            name,
            get,
            set,
            subscribe,
            subscribe_response: subscribe.wrapping_add(RESPONSE_OFFSET),
            context,
            context_response: context.wrapping_add(RESPONSE_OFFSET),
        }
    }

    /// Response id of the get command.
    #[inline]
    #[must_use]
    pub const fn get_response(&self) -> u8 {
        self.get.wrapping_add(RESPONSE_OFFSET)
    }

    /// The six registered ids with their roles.
    #[must_use]
    pub const fn ids(&self) -> [(u8, CommandRole); 6] {
        [
            (self.get, CommandRole::Get),
            (self.set, CommandRole::Set),
            (self.subscribe, CommandRole::Subscribe),
            (self.subscribe_response, CommandRole::SubscribeResponse),
            (self.context, CommandRole::Context),
            (self.context_response, CommandRole::ContextResponse),
        ]
    }
}

/// Routing table from command ids to domains.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    domains: Vec<Domain>,
    lookup: HashMap<u8, (usize, CommandRole)>,
}

impl DomainRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in domain.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for domain in Domain::BUILTIN {
            let registered = registry.register(domain);
            debug_assert!(registered.is_ok(), "built-in domain ids collide: {registered:?}");
            if let Err(e) = registered {
                tracing::error!(error = %e, "built-in domain skipped");
            }
        }
        registry
    }

    /// Registers a domain. Registering the same domain twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::DomainCollision`] if another domain already
    /// owns one of its ids. Nothing is registered in that case.
    pub fn register(&mut self, domain: Domain) -> ControlResult<()> {
        if self.domains.contains(&domain) {
            return Ok(());
        }

        // 1. Validate every id before touching the table
        for (id, _) in domain.ids() {
            if let Some(&(index, _)) = self.lookup.get(&id) {
                return Err(ControlError::DomainCollision {
                    id,
                    owner: self.domains[index].name,
                    claimed: domain.name,
                });
            }
        }

        // 2. Claim them
        let index = self.domains.len();
        for (id, role) in domain.ids() {
            self.lookup.insert(id, (index, role));
        }
        self.domains.push(domain);
        tracing::debug!(domain = domain.name, "domain registered");
        Ok(())
    }

    /// Returns the domain owning `id` and the role of the id.
    #[must_use]
    pub fn resolve(&self, id: u8) -> Option<(Domain, CommandRole)> {
        self.lookup
            .get(&id)
            .map(|&(index, role)| (self.domains[index], role))
    }

    /// Returns the domain whose subscription results carry `response`.
    #[must_use]
    pub fn for_subscription_response(&self, response: u8) -> Option<Domain> {
        match self.resolve(response) {
            Some((domain, CommandRole::SubscribeResponse | CommandRole::ContextResponse)) => {
                Some(domain)
            }
            _ => None,
        }
    }

    /// Returns the domain whose get command is `get`.
    #[must_use]
    pub fn by_get_id(&self, get: u8) -> Option<Domain> {
        match self.resolve(get) {
            Some((domain, CommandRole::Get)) => Some(domain),
            _ => None,
        }
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Extracts a typed payload, reporting a mismatch as a wire error.
fn expect<T>(
    value: TypedValue,
    expected: TypeTag,
    extract: impl FnOnce(TypedValue) -> Option<T>,
) -> ControlResult<T> {
    let found = value.tag();
    extract(value).ok_or_else(|| {
        WireError::UnexpectedType {
            expected: expected.as_byte(),
            found: found.as_byte(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = DomainRegistry::with_builtin();
        assert_eq!(registry.len(), 5);

        assert_eq!(
            registry.resolve(0xEE),
            Some((Domain::PERSON, CommandRole::SubscribeResponse))
        );
        assert_eq!(
            registry.resolve(0x9B),
            Some((Domain::SIMULATION, CommandRole::ContextResponse))
        );
        assert_eq!(registry.resolve(0xC8), Some((Domain::POLYGON, CommandRole::Set)));
        assert_eq!(registry.resolve(0x42), None);
    }

    #[test]
    fn test_builtin_ids_are_disjoint() {
        let mut registry = DomainRegistry::new();
        for domain in Domain::BUILTIN {
            assert!(registry.register(domain).is_ok(), "{} collides", domain.name);
        }
        assert_eq!(registry.len(), Domain::BUILTIN.len());
    }

    #[test]
    fn test_response_offsets() {
        for domain in Domain::BUILTIN {
            assert_eq!(domain.subscribe_response, domain.subscribe + 0x10);
            assert_eq!(domain.context_response, domain.context + 0x10);
            assert_eq!(domain.get_response(), domain.get + 0x10);
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = DomainRegistry::new();
        registry.register(Domain::PERSON).unwrap();
        registry.register(Domain::PERSON).unwrap();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_collision_rejected() {
        let mut registry = DomainRegistry::with_builtin();
        let clash = Domain::new("detector", 0xA0, 0xC0, 0xDE, 0x80);

        let err = registry.register(clash).unwrap_err();
        assert!(matches!(
            err,
            ControlError::DomainCollision {
                id: 0xDE,
                owner: "person",
                claimed: "detector"
            }
        ));
        // nothing of the clashing domain leaked into the table
        assert_eq!(registry.resolve(0xA0), None);
    }

    #[test]
    fn test_subscription_response_lookup() {
        let registry = DomainRegistry::with_builtin();
        assert_eq!(registry.for_subscription_response(0xEB), Some(Domain::SIMULATION));
        assert_eq!(registry.for_subscription_response(0xDB), None);
        assert_eq!(registry.by_get_id(0xAE), Some(Domain::PERSON));
    }
}
