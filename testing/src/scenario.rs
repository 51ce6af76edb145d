//! Fluent Given-When-Then testing for aggregates.
//!
//! Mirrors the shape of a scenario: set up an aggregate (*given*), run one
//! operation on it (*when*), assert on the result, the state, and the
//! buffered events (*then*). The `when` step drains the aggregate's event
//! buffer, so `then_events` sees exactly what a commit would dispatch.

#![allow(clippy::module_name_repetitions)]

use spotswap_core::buffer::Aggregate;

/// The *given* step: holds the aggregate until an operation runs.
pub struct GivenAggregate<A> {
    aggregate: A,
}

/// Fluent test harness for one aggregate operation.
///
/// # Example
///
/// ```ignore
/// AggregateTest::given(wallet)
///     .when(|w| w.charge("ref-1", Credits::new(2.0)))
///     .then_ok()
///     .then_state(|w| assert_eq!(w.transactions().len(), 1));
/// ```
pub struct AggregateTest<A: Aggregate, R, E> {
    aggregate: A,
    result: Result<R, E>,
    events: Vec<A::Event>,
}

impl<A: Aggregate> GivenAggregate<A> {
    /// Run one operation against the aggregate (When).
    ///
    /// Drains the event buffer afterwards, whether or not the operation
    /// succeeded; a failed operation must not leave events behind, and
    /// `then_events` lets tests assert exactly that.
    pub fn when<R, E>(
        mut self,
        operation: impl FnOnce(&mut A) -> Result<R, E>,
    ) -> AggregateTest<A, R, E> {
        let result = operation(&mut self.aggregate);
        let events = self.aggregate.take_uncommitted();
        AggregateTest {
            aggregate: self.aggregate,
            result,
            events,
        }
    }
}

impl<A: Aggregate> AggregateTest<A, (), ()> {
    /// Start a scenario with the prepared aggregate (Given).
    pub const fn given(aggregate: A) -> GivenAggregate<A> {
        GivenAggregate { aggregate }
    }
}

impl<A: Aggregate, R, E> AggregateTest<A, R, E> {
    /// Assert the operation succeeded.
    ///
    /// # Panics
    ///
    /// Panics when the operation returned an error.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn then_ok(self) -> Self
    where
        E: std::fmt::Debug,
    {
        assert!(
            self.result.is_ok(),
            "expected operation to succeed, got {:?}",
            self.result.as_ref().err()
        );
        self
    }

    /// Assert on the error the operation returned.
    ///
    /// # Panics
    ///
    /// Panics when the operation succeeded.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn then_err(self, assertion: impl FnOnce(&E)) -> Self {
        match &self.result {
            Ok(_) => panic!("expected operation to fail, but it succeeded"),
            Err(err) => assertion(err),
        }
        self
    }

    /// Assert on the success value.
    ///
    /// # Panics
    ///
    /// Panics when the operation returned an error.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn then_value(self, assertion: impl FnOnce(&R)) -> Self
    where
        E: std::fmt::Debug,
    {
        match &self.result {
            Ok(value) => assertion(value),
            Err(err) => panic!("expected operation to succeed, got {err:?}"),
        }
        self
    }

    /// Assert on the aggregate state after the operation.
    #[must_use]
    pub fn then_state(self, assertion: impl FnOnce(&A)) -> Self {
        assertion(&self.aggregate);
        self
    }

    /// Assert on the events the operation buffered.
    #[must_use]
    pub fn then_events(self, assertion: impl FnOnce(&[A::Event])) -> Self {
        assertion(&self.events);
        self
    }

    /// Assert the operation buffered no events.
    ///
    /// # Panics
    ///
    /// Panics when events were buffered.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn then_no_events(self) -> Self {
        assert!(
            self.events.is_empty(),
            "expected no buffered events, found {}",
            self.events.len()
        );
        self
    }

    /// Tear down into the aggregate, result, and drained events.
    pub fn into_parts(self) -> (A, Result<R, E>, Vec<A::Event>) {
        (self.aggregate, self.result, self.events)
    }
}
