use crowdctl_wire::TypedValue;

use super::Domain;
use crate::channel::Channel;
use crate::error::ControlResult;
use crate::subscription::Window;

/// One domain addressed through a borrowed [`Channel`].
///
/// Typed accessors ([`super::PersonApi`], [`super::MiscApi`], ...) wrap a
/// handle and never touch the socket directly.
#[derive(Debug)]
pub struct DomainHandle<'a> {
    domain: Domain,
    channel: &'a mut Channel,
}

impl<'a> DomainHandle<'a> {
    /// Creates a handle for `domain`.
    pub fn new(domain: Domain, channel: &'a mut Channel) -> Self {
        Self { domain, channel }
    }

    /// The addressed domain.
    #[inline]
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    pub(crate) fn channel(&mut self) -> &mut Channel {
        self.channel
    }

    /// Reads `variable` of `object`.
    ///
    /// # Errors
    ///
    /// See [`Channel::get`].
    pub fn get(&mut self, variable: u8, object: &str) -> ControlResult<TypedValue> {
        self.channel.get(&self.domain, variable, object, None)
    }

    /// Reads `variable` of `object`, passing `parameter` along.
    ///
    /// # Errors
    ///
    /// See [`Channel::get`].
    pub fn get_with(&mut self, variable: u8, object: &str, parameter: &TypedValue) -> ControlResult<TypedValue> {
        self.channel.get(&self.domain, variable, object, Some(parameter))
    }

    /// Writes `variable` of `object`.
    ///
    /// # Errors
    ///
    /// See [`Channel::set`].
    pub fn set(&mut self, variable: u8, object: &str, value: &TypedValue) -> ControlResult<()> {
        self.channel.set(&self.domain, variable, object, value)
    }

    /// Subscribes `object` to `variables`.
    ///
    /// # Errors
    ///
    /// See [`Channel::subscribe`].
    pub fn subscribe(&mut self, object: &str, variables: &[u8], window: Window) -> ControlResult<()> {
        self.channel.subscribe(&self.domain, object, variables, window)
    }

    /// Removes the subscription of `object`.
    ///
    /// # Errors
    ///
    /// See [`Channel::unsubscribe`].
    pub fn unsubscribe(&mut self, object: &str) -> ControlResult<()> {
        self.channel.unsubscribe(&self.domain, object)
    }

    /// Subscribes to objects of `context_domain` within `distance` of
    /// `object`.
    ///
    /// # Errors
    ///
    /// See [`Channel::subscribe_context`].
    pub fn subscribe_context(
        &mut self,
        object: &str,
        context_domain: &Domain,
        distance: f64,
        variables: &[u8],
        window: Window,
    ) -> ControlResult<()> {
        self.channel
            .subscribe_context(&self.domain, object, context_domain, distance, variables, window)
    }
}
