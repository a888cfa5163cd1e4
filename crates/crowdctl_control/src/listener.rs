//! # Subscription Listeners
//!
//! Listeners declare which variables they need and turn the decoded
//! subscription map into their own state after every parse.
//!
//! ```text
//! interest: {response id -> {object id -> [variable ids]}}
//!
//!   ""   global object
//!   "*"  every member of the domain (subscribed per member)
//! ```
//!
//! The [`DefaultListener`] is always present. It tracks the person
//! membership list, departures, arrivals and the simulation time.

use std::any::Any;
use std::collections::BTreeMap;

use crowdctl_wire::constants::{
    GLOBAL_OBJECT_ID, RESPONSE_SUBSCRIBE_PERSON_VARIABLE, RESPONSE_SUBSCRIBE_SIM_VARIABLE,
    VAR_ARRIVED_PEDESTRIAN_IDS, VAR_DEPARTED_PEDESTRIAN_IDS, VAR_ID_LIST, VAR_POSITION,
    VAR_TARGET_LIST, VAR_TIME,
};
use crowdctl_wire::TypedValue;

use crate::subscription::{SubscriptionMap, ALL_OBJECTS};

/// Response id to object id to variable ids.
pub type Interest = BTreeMap<u8, BTreeMap<String, Vec<u8>>>;

/// Consumer of the decoded subscription map.
pub trait Listener: Any + Send {
    /// Unique name within a [`Listeners`] collection.
    fn name(&self) -> &str;

    /// Variables this listener needs.
    fn interest(&self) -> Interest;

    /// Returns false if the connection should not subscribe the interest
    /// during initialization.
    fn subscribes_initially(&self) -> bool {
        true
    }

    /// Rebuilds derived state from the latest values.
    fn handle_subscription_result(&mut self, map: &SubscriptionMap);

    /// Upcast for [`Listeners::get`].
    fn as_any(&self) -> &dyn Any;
}

/// One person as seen by the [`DefaultListener`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pedestrian {
    /// Person id.
    pub id: String,
    /// Variable name to value.
    pub values: BTreeMap<String, TypedValue>,
}

impl Pedestrian {
    /// Value of the variable named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }
}

/// Tracks persons and time.
#[derive(Debug, Clone)]
pub struct DefaultListener {
    name: String,
    /// Per-person variables as (name, variable id).
    person_variables: Vec<(String, u8)>,
    all_ids: Vec<String>,
    new_ids: Vec<String>,
    removed_ids: Vec<String>,
    time: Option<f64>,
    pedestrians: Vec<Pedestrian>,
}

impl DefaultListener {
    /// Name of the listener every connection carries.
    pub const NAME: &'static str = "default";

    /// Creates a listener subscribing every person to `person_variables`.
    #[must_use]
    pub fn new(person_variables: Vec<(String, u8)>) -> Self {
        Self {
            name: Self::NAME.to_owned(),
            person_variables,
            all_ids: Vec::new(),
            new_ids: Vec::new(),
            removed_ids: Vec::new(),
            time: None,
            pedestrians: Vec::new(),
        }
    }

    /// Position and target list per person.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![
            ("pos".to_owned(), VAR_POSITION),
            ("target_list".to_owned(), VAR_TARGET_LIST),
        ])
    }

    /// Variable ids every person is subscribed to.
    #[must_use]
    pub fn person_variable_ids(&self) -> Vec<u8> {
        self.person_variables.iter().map(|(_, id)| *id).collect()
    }

    /// Every person currently in the simulation.
    #[must_use]
    pub fn pedestrian_ids(&self) -> &[String] {
        &self.all_ids
    }

    /// Persons that entered during the last step.
    #[must_use]
    pub fn new_pedestrian_ids(&self) -> &[String] {
        &self.new_ids
    }

    /// Persons that left during the last step.
    #[must_use]
    pub fn removed_pedestrian_ids(&self) -> &[String] {
        &self.removed_ids
    }

    /// Simulation time of the last result, if the peer reported it.
    #[inline]
    #[must_use]
    pub const fn time(&self) -> Option<f64> {
        self.time
    }

    /// Persons with their subscribed variables.
    #[must_use]
    pub fn pedestrians(&self) -> &[Pedestrian] {
        &self.pedestrians
    }

    /// One person by id.
    #[must_use]
    pub fn pedestrian(&self, id: &str) -> Option<&Pedestrian> {
        self.pedestrians.iter().find(|p| p.id == id)
    }

    fn reset(&mut self) {
        self.all_ids.clear();
        self.new_ids.clear();
        self.removed_ids.clear();
        self.time = None;
        self.pedestrians.clear();
    }
}

impl Default for DefaultListener {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Listener for DefaultListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self) -> Interest {
        let mut person = BTreeMap::new();
        person.insert(GLOBAL_OBJECT_ID.to_owned(), vec![VAR_ID_LIST]);
        if !self.person_variables.is_empty() {
            person.insert(ALL_OBJECTS.to_owned(), self.person_variable_ids());
        }

        let mut simulation = BTreeMap::new();
        simulation.insert(
            GLOBAL_OBJECT_ID.to_owned(),
            vec![VAR_TIME, VAR_DEPARTED_PEDESTRIAN_IDS, VAR_ARRIVED_PEDESTRIAN_IDS],
        );

        let mut interest = Interest::new();
        interest.insert(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, person);
        interest.insert(RESPONSE_SUBSCRIBE_SIM_VARIABLE, simulation);
        interest
    }

    fn handle_subscription_result(&mut self, map: &SubscriptionMap) {
        self.reset();

        if let Some(sim) = map.variables(RESPONSE_SUBSCRIBE_SIM_VARIABLE, GLOBAL_OBJECT_ID) {
            self.time = sim.get(&VAR_TIME).and_then(TypedValue::as_f64);
            self.new_ids = string_list(sim.get(&VAR_DEPARTED_PEDESTRIAN_IDS));
            self.removed_ids = string_list(sim.get(&VAR_ARRIVED_PEDESTRIAN_IDS));
        }

        let Some(persons) = map.get(RESPONSE_SUBSCRIBE_PERSON_VARIABLE) else {
            return;
        };
        self.all_ids = string_list(persons.value(GLOBAL_OBJECT_ID, VAR_ID_LIST));

        for (id, vars) in persons.objects() {
            if id == GLOBAL_OBJECT_ID || vars.is_empty() {
                continue;
            }
            let values = self
                .person_variables
                .iter()
                .filter_map(|(name, var)| vars.get(var).map(|v| (name.clone(), v.clone())))
                .collect();
            self.pedestrians.push(Pedestrian {
                id: id.clone(),
                values,
            });
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn string_list(value: Option<&TypedValue>) -> Vec<String> {
    value
        .and_then(TypedValue::as_string_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

/// The default listener plus any number of named extras.
pub struct Listeners {
    default: DefaultListener,
    extra: Vec<Box<dyn Listener>>,
}

impl Listeners {
    /// Creates a collection around `default`.
    #[must_use]
    pub fn new(default: DefaultListener) -> Self {
        Self {
            default,
            extra: Vec::new(),
        }
    }

    /// Adds a listener. A listener with the same name is replaced.
    pub fn add(&mut self, listener: Box<dyn Listener>) {
        self.extra.retain(|l| l.name() != listener.name());
        self.extra.push(listener);
    }

    /// The default listener.
    #[inline]
    #[must_use]
    pub const fn default_listener(&self) -> &DefaultListener {
        &self.default
    }

    /// Looks up a listener by name and concrete type.
    #[must_use]
    pub fn get<T: Listener>(&self, name: &str) -> Option<&T> {
        if name == self.default.name() {
            return self.default.as_any().downcast_ref::<T>();
        }
        self.extra
            .iter()
            .find(|l| l.name() == name)
            .and_then(|l| l.as_any().downcast_ref::<T>())
    }

    /// Names of every listener, default first.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(self.default.name())
            .chain(self.extra.iter().map(|l| l.name()))
            .collect()
    }

    /// Every listener, default first.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Listener + 'static)> {
        let default: &(dyn Listener + 'static) = &self.default;
        std::iter::once(default).chain(self.extra.iter().map(|l| &**l))
    }

    /// Hands `map` to every listener.
    pub fn notify(&mut self, map: &SubscriptionMap) {
        self.default.handle_subscription_result(map);
        for listener in &mut self.extra {
            listener.handle_subscription_result(map);
        }
    }
}

impl Default for Listeners {
    fn default() -> Self {
        Self::new(DefaultListener::default())
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("names", &self.names()).finish()
    }
}
