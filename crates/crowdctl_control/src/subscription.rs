//! # Subscription Engine
//!
//! Standing requests for object variables, refreshed by every step.
//!
//! ## Result Block
//!
//! ```text
//! [i32 count] then `count` results, each one of:
//!
//! variable: [len][response][object][u8 n] n x ([var][status][typed value])
//! context:  [len][response][owner][u8 domain][u8 n][i32 members]
//!           members x ([member id] n x ([var][status][typed value]))
//! ```
//!
//! Every parse starts by clearing all tracked values. A variable missing
//! from the block is therefore absent from the map, never stale.
//!
//! ## Membership
//!
//! A wildcard subscription (`"*"`) names the variables every member of a
//! domain should carry. [`SubscriptionEngine::reconcile`] subscribes new
//! members and drops vanished ones so the next step already reports them.

use std::collections::{BTreeMap, BTreeSet};

use crowdctl_wire::constants::{GLOBAL_OBJECT_ID, INVALID_DOUBLE_VALUE};
use crowdctl_wire::{Command, FrameReader, WireError};

use crate::domain::{CommandRole, Domain, DomainRegistry};
use crate::error::{ControlError, ControlResult};
use crate::transport::FrameTransport;

/// Object id pattern meaning "every member object of the domain".
pub const ALL_OBJECTS: &str = "*";

/// Variable id to latest value.
pub type VariableMap = BTreeMap<u8, crowdctl_wire::TypedValue>;

/// Time window of a subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// First time the subscription reports.
    pub begin: f64,
    /// Last time the subscription reports.
    pub end: f64,
}

impl Window {
    /// Unbounded window.
    pub const ALWAYS: Self = Self {
        begin: INVALID_DOUBLE_VALUE,
        end: INVALID_DOUBLE_VALUE,
    };

    /// Creates a window.
    #[must_use]
    pub const fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::ALWAYS
    }
}

/// Members reported by one context subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextEntry {
    /// Get command id of the members' domain.
    pub domain: u8,
    /// Member id to its variables.
    pub members: BTreeMap<String, VariableMap>,
}

/// Everything known for one response id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionResults {
    objects: BTreeMap<String, VariableMap>,
    contexts: BTreeMap<String, ContextEntry>,
}

impl SubscriptionResults {
    /// Object id to variables of the variable subscriptions.
    #[must_use]
    pub const fn objects(&self) -> &BTreeMap<String, VariableMap> {
        &self.objects
    }

    /// Variables of one object.
    #[must_use]
    pub fn get(&self, object: &str) -> Option<&VariableMap> {
        self.objects.get(object)
    }

    /// One value of one object.
    #[must_use]
    pub fn value(&self, object: &str, variable: u8) -> Option<&crowdctl_wire::TypedValue> {
        self.objects.get(object)?.get(&variable)
    }

    /// Context entry owned by `owner`.
    #[must_use]
    pub fn context(&self, owner: &str) -> Option<&ContextEntry> {
        self.contexts.get(owner)
    }

    /// Owner id to context entry.
    #[must_use]
    pub const fn contexts(&self) -> &BTreeMap<String, ContextEntry> {
        &self.contexts
    }

    /// Returns true if no value is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.values().all(BTreeMap::is_empty)
            && self.contexts.values().all(|c| c.members.is_empty())
    }

    fn reset(&mut self) {
        for vars in self.objects.values_mut() {
            vars.clear();
        }
        for context in self.contexts.values_mut() {
            context.members.clear();
        }
    }
}

/// Response id to results. Handed to every listener.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionMap {
    results: BTreeMap<u8, SubscriptionResults>,
}

impl SubscriptionMap {
    /// Results for one response id.
    #[must_use]
    pub fn get(&self, response: u8) -> Option<&SubscriptionResults> {
        self.results.get(&response)
    }

    /// Variables of one object under one response id.
    #[must_use]
    pub fn variables(&self, response: u8, object: &str) -> Option<&VariableMap> {
        self.results.get(&response)?.get(object)
    }

    /// One value.
    #[must_use]
    pub fn value(&self, response: u8, object: &str, variable: u8) -> Option<&crowdctl_wire::TypedValue> {
        self.results.get(&response)?.value(object, variable)
    }

    /// Iterates over response ids and their results.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &SubscriptionResults)> {
        self.results.iter().map(|(id, results)| (*id, results))
    }

    /// Returns true if no value is held anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.values().all(SubscriptionResults::is_empty)
    }

    fn entry(&mut self, response: u8) -> &mut SubscriptionResults {
        self.results.entry(response).or_default()
    }

    /// Parses a result block into a map of its own, leaving every other
    /// map untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] for response ids no
    /// subscription domain owns, and wire errors for malformed blocks.
    pub fn parse(reader: &mut FrameReader<'_>, registry: &DomainRegistry) -> ControlResult<Self> {
        let mut map = Self::default();
        let count = reader.read_count()?;
        for _ in 0..count {
            map.read_result(reader, registry)?;
        }
        Ok(map)
    }

    /// Folds `other` into this map. Values in `other` win.
    fn merge(&mut self, other: Self) {
        for (response, results) in other.results {
            let target = self.entry(response);
            for (object, vars) in results.objects {
                target.objects.entry(object).or_default().extend(vars);
            }
            for (owner, context) in results.contexts {
                let entry = target.contexts.entry(owner).or_default();
                entry.domain = context.domain;
                for (member, vars) in context.members {
                    entry.members.entry(member).or_default().extend(vars);
                }
            }
        }
    }

    /// Reads one sub-result into this map.
    fn read_result(
        &mut self,
        reader: &mut FrameReader<'_>,
        registry: &DomainRegistry,
    ) -> ControlResult<(String, u8)> {
        let _length = reader.read_length()?;
        let response = reader.read_u8()?;
        let object = reader.read_string()?;

        let role = match registry.resolve(response) {
            Some((_, role @ (CommandRole::SubscribeResponse | CommandRole::ContextResponse))) => role,
            _ => {
                return Err(ControlError::FatalProtocol(format!(
                    "cannot handle subscription response 0x{response:02x} for {object:?}"
                )))
            }
        };

        if role == CommandRole::SubscribeResponse {
            let count = reader.read_u8()?;
            // entry exists even if every variable failed
            let results = self.entry(response);
            let vars = results.objects.entry(object.clone()).or_default();
            for _ in 0..count {
                if let Some((var, value)) = read_triple(reader, response, &object)? {
                    vars.insert(var, value);
                }
            }
        } else {
            let context_domain = reader.read_u8()?;
            let count = reader.read_u8()?;
            let member_count = reader.read_count()?;
            let entry = self
                .entry(response)
                .contexts
                .entry(object.clone())
                .or_default();
            entry.domain = context_domain;
            for _ in 0..member_count {
                let member = reader.read_string()?;
                let vars = entry.members.entry(member.clone()).or_default();
                for _ in 0..count {
                    if let Some((var, value)) = read_triple(reader, response, &member)? {
                        vars.insert(var, value);
                    }
                }
            }
        }

        Ok((object, response))
    }
}

/// Ids touched by a membership pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    /// Newly subscribed members.
    pub added: Vec<String>,
    /// Dropped members.
    pub removed: Vec<String>,
}

impl MembershipChange {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Live subscriptions and their latest values.
#[derive(Debug, Default)]
pub struct SubscriptionEngine {
    /// Latest values.
    map: SubscriptionMap,
    /// (subscribe id, object) to subscribed variables.
    subscribed: BTreeMap<(u8, String), Vec<u8>>,
    /// Subscribe id to the variables every member carries.
    wildcards: BTreeMap<u8, Vec<u8>>,
    /// Subscribe id to the members subscribed through the wildcard.
    members: BTreeMap<u8, BTreeSet<String>>,
}

impl SubscriptionEngine {
    /// Creates an engine without subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest values.
    #[inline]
    #[must_use]
    pub const fn map(&self) -> &SubscriptionMap {
        &self.map
    }

    /// Variables subscribed for `object`.
    #[must_use]
    pub fn subscribed_variables(&self, domain: &Domain, object: &str) -> Option<&[u8]> {
        self.subscribed
            .get(&(domain.subscribe, object.to_owned()))
            .map(Vec::as_slice)
    }

    /// Members currently subscribed through the wildcard of `domain`.
    #[must_use]
    pub fn members(&self, domain: &Domain) -> Vec<&str> {
        self.members
            .get(&domain.subscribe)
            .map(|m| m.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Adds variables every member of `domain` should carry.
    pub fn add_wildcard(&mut self, domain: &Domain, variables: &[u8]) {
        let vars = self.wildcards.entry(domain.subscribe).or_default();
        for var in variables {
            if !vars.contains(var) {
                vars.push(*var);
            }
        }
    }

    /// Variables every member of `domain` carries.
    #[must_use]
    pub fn wildcard(&self, domain: &Domain) -> Option<&[u8]> {
        self.wildcards.get(&domain.subscribe).map(Vec::as_slice)
    }

    /// Subscribes `object` to `variables`. An empty list unsubscribes.
    ///
    /// The first result delivered with the reply is merged into the map.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] if the reply addresses a
    /// different response id or object.
    pub fn subscribe(
        &mut self,
        transport: &mut FrameTransport,
        registry: &DomainRegistry,
        domain: &Domain,
        object: &str,
        variables: &[u8],
        window: Window,
    ) -> ControlResult<()> {
        let mut command = Command::subscription(domain.subscribe, window.begin, window.end, object)
            .with_u8(var_count(variables)?);
        for var in variables {
            command = command.with_u8(*var);
        }
        transport.queue(&command)?;
        let response = transport.send_exact()?;

        if variables.is_empty() {
            self.forget(domain, object);
            tracing::debug!(domain = domain.name, object, "unsubscribed");
            return Ok(());
        }

        let mut reader = response.reader();
        let mut echo = SubscriptionMap::default();
        let (echoed, response_id) = echo.read_result(&mut reader, registry)?;
        check_echo(domain.subscribe, object, response_id, &echoed)?;
        self.map.merge(echo);

        self.subscribed
            .insert((domain.subscribe, object.to_owned()), variables.to_vec());
        tracing::debug!(domain = domain.name, object, ?variables, "subscribed");
        Ok(())
    }

    /// Removes the subscription of `object`.
    ///
    /// # Errors
    ///
    /// Propagates transport and peer errors.
    pub fn unsubscribe(
        &mut self,
        transport: &mut FrameTransport,
        registry: &DomainRegistry,
        domain: &Domain,
        object: &str,
    ) -> ControlResult<()> {
        self.subscribe(transport, registry, domain, object, &[], Window::ALWAYS)
    }

    /// Subscribes to the objects of `context_domain` within `distance` of
    /// `object`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] if the reply addresses a
    /// different response id or object.
    #[allow(clippy::too_many_arguments)]
    pub fn subscribe_context(
        &mut self,
        transport: &mut FrameTransport,
        registry: &DomainRegistry,
        domain: &Domain,
        object: &str,
        context_domain: &Domain,
        distance: f64,
        variables: &[u8],
        window: Window,
    ) -> ControlResult<()> {
        let mut command = Command::subscription(domain.context, window.begin, window.end, object)
            .with_u8(context_domain.get)
            .with_f64(distance)
            .with_u8(var_count(variables)?);
        for var in variables {
            command = command.with_u8(*var);
        }
        transport.queue(&command)?;
        let response = transport.send_exact()?;

        if variables.is_empty() {
            self.map.entry(domain.context_response).contexts.remove(object);
            return Ok(());
        }

        let mut reader = response.reader();
        let mut echo = SubscriptionMap::default();
        let (echoed, response_id) = echo.read_result(&mut reader, registry)?;
        check_echo(domain.context, object, response_id, &echoed)?;
        self.map.merge(echo);
        tracing::debug!(domain = domain.name, object, context = context_domain.name, "context subscribed");
        Ok(())
    }

    /// Parses a result block, replacing every previously held value.
    ///
    /// Returns `(object id, response id)` per result in block order.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] for response ids no
    /// registered domain owns.
    pub fn parse_result(
        &mut self,
        reader: &mut FrameReader<'_>,
        registry: &DomainRegistry,
    ) -> ControlResult<Vec<(String, u8)>> {
        for results in self.map.results.values_mut() {
            results.reset();
        }

        let count = reader.read_count()?;
        let mut parsed = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            parsed.push(self.map.read_result(reader, registry)?);
        }
        Ok(parsed)
    }

    /// Aligns wildcard members of `domain` with `ids`.
    ///
    /// New ids are subscribed with the wildcard variables, vanished ids are
    /// unsubscribed. A refused subscribe is retried on the next pass. A
    /// refused unsubscribe only drops the entry locally.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors and normal termination.
    pub fn reconcile(
        &mut self,
        transport: &mut FrameTransport,
        registry: &DomainRegistry,
        domain: &Domain,
        ids: &[String],
    ) -> ControlResult<MembershipChange> {
        let Some(variables) = self.wildcards.get(&domain.subscribe).cloned() else {
            return Ok(MembershipChange::default());
        };

        let current: BTreeSet<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| *id != GLOBAL_OBJECT_ID && *id != ALL_OBJECTS)
            .collect();
        let known = self.members.get(&domain.subscribe).cloned().unwrap_or_default();

        let mut change = MembershipChange::default();

        for id in current.iter().filter(|id| !known.contains(**id)) {
            match self.subscribe(transport, registry, domain, id, &variables, Window::ALWAYS) {
                Ok(()) => {}
                Err(e) if e.is_fatal() || e.is_normal_termination() => return Err(e),
                Err(e) => {
                    // retried on the next pass
                    tracing::warn!(domain = domain.name, object = %id, error = %e, "member subscription rejected");
                    continue;
                }
            }
            self.members
                .entry(domain.subscribe)
                .or_default()
                .insert((*id).to_owned());
            change.added.push((*id).to_owned());
        }

        for id in known.iter().filter(|id| !current.contains(id.as_str())) {
            match self.unsubscribe(transport, registry, domain, id) {
                Ok(()) => {}
                Err(e) if e.is_fatal() || e.is_normal_termination() => return Err(e),
                Err(e) => {
                    tracing::warn!(domain = domain.name, object = %id, error = %e, "unsubscribe rejected, dropping locally");
                    self.forget(domain, id);
                }
            }
            if let Some(members) = self.members.get_mut(&domain.subscribe) {
                members.remove(id);
            }
            change.removed.push(id.clone());
        }

        if !change.is_empty() {
            tracing::debug!(
                domain = domain.name,
                added = change.added.len(),
                removed = change.removed.len(),
                "membership reconciled"
            );
        }
        Ok(change)
    }

    fn forget(&mut self, domain: &Domain, object: &str) {
        self.subscribed.remove(&(domain.subscribe, object.to_owned()));
        if let Some(results) = self.map.results.get_mut(&domain.subscribe_response) {
            results.objects.remove(object);
        }
    }
}

fn read_triple(
    reader: &mut FrameReader<'_>,
    response: u8,
    object: &str,
) -> ControlResult<Option<(u8, crowdctl_wire::TypedValue)>> {
    let var = reader.read_u8()?;
    let status = reader.read_u8()?;
    if status != 0 {
        let message = reader.read_typed_string()?;
        tracing::warn!(response, object, variable = var, status, error = %message, "subscription variable failed");
        return Ok(None);
    }
    Ok(Some((var, reader.read_value()?)))
}

fn var_count(variables: &[u8]) -> ControlResult<u8> {
    u8::try_from(variables.len()).map_err(|_| WireError::LengthOverflow(variables.len()).into())
}

fn check_echo(command: u8, object: &str, response: u8, echoed: &str) -> ControlResult<()> {
    if response.wrapping_sub(command) != crowdctl_wire::constants::RESPONSE_OFFSET || echoed != object {
        return Err(ControlError::FatalProtocol(format!(
            "received answer 0x{response:02x},{echoed:?} for subscription command 0x{command:02x},{object:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_result, result_block, status_frame, variable_result, ScriptedStream};
    use crowdctl_wire::constants::{
        CMD_SUBSCRIBE_PERSON_VARIABLE, RESPONSE_SUBSCRIBE_PERSON_CONTEXT,
        RESPONSE_SUBSCRIBE_PERSON_VARIABLE, RESPONSE_SUBSCRIBE_SIM_VARIABLE, VAR_ID_LIST,
        VAR_POSITION, VAR_SPEED, VAR_TIME,
    };
    use crowdctl_wire::{FrameWriter, Status, TypedValue};

    fn ids(list: &[&str]) -> TypedValue {
        TypedValue::StringList(list.iter().map(|s| (*s).to_owned()).collect())
    }

    fn subscribe_reply(object: &str, vars: &[(u8, TypedValue)]) -> Vec<u8> {
        status_frame(
            &[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)],
            &variable_result(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, object, vars),
        )
    }

    #[test]
    fn test_subscribe_merges_first_result() {
        let reply = subscribe_reply("", &[(VAR_ID_LIST, ids(&["1", "2"]))]);
        let (stream, sent) = ScriptedStream::new(vec![reply]);
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();

        engine
            .subscribe(&mut transport, &registry, &Domain::PERSON, "", &[VAR_ID_LIST], Window::ALWAYS)
            .unwrap();

        assert_eq!(
            engine.map().value(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "", VAR_ID_LIST),
            Some(&ids(&["1", "2"]))
        );
        assert_eq!(engine.subscribed_variables(&Domain::PERSON, ""), Some(&[VAR_ID_LIST][..]));

        // [len][id][begin][end][objLen][obj][n][var]
        let written = sent.lock().clone();
        assert_eq!(written[5], CMD_SUBSCRIBE_PERSON_VARIABLE);
        assert_eq!(&written[written.len() - 2..], &[1, VAR_ID_LIST]);
    }

    #[test]
    fn test_subscribe_echo_mismatch_is_fatal() {
        let reply = subscribe_reply("7", &[(VAR_SPEED, TypedValue::Double(1.0))]);
        let (stream, _) = ScriptedStream::new(vec![reply]);
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();

        let err = engine
            .subscribe(&mut transport, &registry, &Domain::PERSON, "8", &[VAR_SPEED], Window::ALWAYS)
            .unwrap_err();
        assert!(matches!(err, ControlError::FatalProtocol(_)));

        // the rejected echo left nothing behind
        assert!(engine.map().get(RESPONSE_SUBSCRIBE_PERSON_VARIABLE).is_none());
        assert!(engine.map().variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "7").is_none());
        assert!(engine.subscribed_variables(&Domain::PERSON, "8").is_none());
    }

    #[test]
    fn test_detached_parse_keeps_engine_values() {
        let first = subscribe_reply("1", &[(VAR_SPEED, TypedValue::Double(1.2))]);
        let (stream, _) = ScriptedStream::new(vec![first]);
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();
        engine
            .subscribe(&mut transport, &registry, &Domain::PERSON, "1", &[VAR_SPEED], Window::ALWAYS)
            .unwrap();

        let block = result_block(&[variable_result(
            RESPONSE_SUBSCRIBE_PERSON_VARIABLE,
            "1",
            &[(VAR_SPEED, TypedValue::Double(0.3))],
        )]);
        let detached = SubscriptionMap::parse(&mut FrameReader::new(&block), &registry).unwrap();

        assert_eq!(
            detached.value(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "1", VAR_SPEED),
            Some(&TypedValue::Double(0.3))
        );
        assert_eq!(
            engine.map().value(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "1", VAR_SPEED),
            Some(&TypedValue::Double(1.2))
        );
    }

    #[test]
    fn test_parse_resets_stale_values() {
        let first = subscribe_reply("1", &[(VAR_SPEED, TypedValue::Double(1.2))]);
        let (stream, _) = ScriptedStream::new(vec![first]);
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();
        engine
            .subscribe(&mut transport, &registry, &Domain::PERSON, "1", &[VAR_SPEED], Window::ALWAYS)
            .unwrap();
        assert!(!engine.map().is_empty());

        let empty = result_block(&[]);
        engine
            .parse_result(&mut FrameReader::new(&empty), &registry)
            .unwrap();

        assert!(engine.map().is_empty());
        // key survives, value does not
        assert_eq!(
            engine.map().variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "1"),
            Some(&VariableMap::new())
        );
    }

    #[test]
    fn test_parse_variable_and_context_results() {
        let block = result_block(&[
            variable_result(RESPONSE_SUBSCRIBE_SIM_VARIABLE, "", &[(VAR_TIME, TypedValue::Double(4.0))]),
            context_result(
                RESPONSE_SUBSCRIBE_PERSON_CONTEXT,
                "1",
                0xAE,
                &[VAR_POSITION],
                &[
                    ("2", vec![TypedValue::Position2D { x: 1.0, y: 2.0 }]),
                    ("3", vec![TypedValue::Position2D { x: 3.0, y: 4.0 }]),
                ],
            ),
        ]);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();

        let parsed = engine
            .parse_result(&mut FrameReader::new(&block), &registry)
            .unwrap();

        assert_eq!(
            parsed,
            vec![
                (String::new(), RESPONSE_SUBSCRIBE_SIM_VARIABLE),
                ("1".to_owned(), RESPONSE_SUBSCRIBE_PERSON_CONTEXT)
            ]
        );
        assert_eq!(
            engine.map().value(RESPONSE_SUBSCRIBE_SIM_VARIABLE, "", VAR_TIME),
            Some(&TypedValue::Double(4.0))
        );
        let context = engine
            .map()
            .get(RESPONSE_SUBSCRIBE_PERSON_CONTEXT)
            .and_then(|r| r.context("1"))
            .unwrap();
        assert_eq!(context.domain, 0xAE);
        assert_eq!(context.members.len(), 2);
        assert_eq!(
            context.members["3"].get(&VAR_POSITION),
            Some(&TypedValue::Position2D { x: 3.0, y: 4.0 })
        );
    }

    #[test]
    fn test_failed_variable_is_skipped() {
        let mut body = FrameWriter::new();
        body.write_u8(RESPONSE_SUBSCRIBE_PERSON_VARIABLE);
        body.write_string("1").unwrap();
        body.write_u8(2);
        body.write_u8(VAR_SPEED);
        body.write_u8(0xFF);
        TypedValue::from("no speed").encode(&mut body).unwrap();
        body.write_u8(VAR_POSITION);
        body.write_u8(0x00);
        TypedValue::Position2D { x: 0.5, y: 0.5 }.encode(&mut body).unwrap();
        let mut result = vec![(body.len() + 1) as u8];
        result.extend_from_slice(body.as_slice());

        let block = result_block(&[result]);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();
        engine
            .parse_result(&mut FrameReader::new(&block), &registry)
            .unwrap();

        let vars = engine.map().variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "1").unwrap();
        assert_eq!(vars.len(), 1);
        assert!(vars.contains_key(&VAR_POSITION));
    }

    #[test]
    fn test_unknown_response_is_fatal() {
        let block = result_block(&[variable_result(0x42, "", &[])]);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();

        let err = engine
            .parse_result(&mut FrameReader::new(&block), &registry)
            .unwrap_err();
        assert!(matches!(err, ControlError::FatalProtocol(_)));
    }

    #[test]
    fn test_reconcile_adds_and_removes_members() {
        let replies = vec![
            subscribe_reply("1", &[(VAR_POSITION, TypedValue::Position2D { x: 1.0, y: 1.0 })]),
            subscribe_reply("2", &[(VAR_POSITION, TypedValue::Position2D { x: 2.0, y: 2.0 })]),
            // unsubscribe of "1" is rejected by the peer
            status_frame(
                &[Status::new(
                    CMD_SUBSCRIBE_PERSON_VARIABLE,
                    crowdctl_wire::ResultCode::Error,
                    "unknown person",
                )],
                &[],
            ),
        ];
        let (stream, _) = ScriptedStream::new(replies);
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();
        engine.add_wildcard(&Domain::PERSON, &[VAR_POSITION]);

        let change = engine
            .reconcile(&mut transport, &registry, &Domain::PERSON, &["1".into(), "2".into()])
            .unwrap();
        assert_eq!(change.added, vec!["1".to_owned(), "2".to_owned()]);
        assert_eq!(engine.members(&Domain::PERSON), vec!["1", "2"]);
        assert!(engine.map().variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "2").is_some());

        let change = engine
            .reconcile(&mut transport, &registry, &Domain::PERSON, &["2".into()])
            .unwrap();
        assert_eq!(change.removed, vec!["1".to_owned()]);
        assert_eq!(engine.members(&Domain::PERSON), vec!["2"]);
        assert!(engine.map().variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "1").is_none());
        assert!(engine.subscribed_variables(&Domain::PERSON, "1").is_none());
    }

    #[test]
    fn test_reconcile_without_wildcard_is_noop() {
        let (stream, sent) = ScriptedStream::new(Vec::new());
        let mut transport = FrameTransport::new(stream);
        let registry = DomainRegistry::with_builtin();
        let mut engine = SubscriptionEngine::new();

        let change = engine
            .reconcile(&mut transport, &registry, &Domain::PERSON, &["1".into()])
            .unwrap();
        assert!(change.is_empty());
        assert!(sent.lock().is_empty());
    }
}
