//! Value function and critic models.
//!
//! The parametrized value function estimated by a critic is modeled as a trait, as is the critic itself.
//! The parameter vector is a struct shared between the critic that writes it and the readers (policies) that use it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use na::{DVector, RealField};
use nalgebra as na;

use crate::error::{KtdError, Result};

/// A parametrized action value function q(theta, s, a).
///
/// Must be pure given theta. Tabular, linear basis and neural network approximators all fit this contract.
/// Closures `Fn(&DVector<N>, &S, &A) -> N` implement it.
pub trait ActionValue<N: RealField, S, A> {
    fn value(&self, theta: &DVector<N>, s: &S, a: &A) -> N;
}

impl<N: RealField, S, A, F> ActionValue<N, S, A> for F
where
    F: Fn(&DVector<N>, &S, &A) -> N,
{
    fn value(&self, theta: &DVector<N>, s: &S, a: &A) -> N {
        self(theta, s, a)
    }
}

/// A critic.
///
/// Learns the parameters of a value function from observed transitions.
/// Episode drivers select `learn_terminal` when the simulator signals a terminal state.
///
/// Both operations return the reciprocal condition number of the critic's belief after the update.
pub trait Critic<N: RealField, S, A> {
    /// Learn from a transition (s, a, r) into a terminal state.
    fn learn_terminal(&mut self, s: &S, a: &A, r: N) -> Result<N>;

    /// Learn from a transition (s, a, r, s', a').
    fn learn(&mut self, s: &S, a: &A, r: N, s_next: &S, a_next: &A) -> Result<N>;
}

/// Shared parameter vector.
///
/// The critic writes the parameters after each transition, and any number of readers, typically a policy built on
/// the same value function, read them. Cloning the buffer shares it: all clones see the critic's updates.
///
/// Readers must not hold a [`read`] borrow while the critic learns; the critic then fails with
/// [`KtdError::ParameterBufferBusy`] rather than write.
///
/// Single threaded. Parallel experiments use one buffer and one critic per worker.
///
/// [`read`]: ParameterBuffer::read
#[derive(Debug)]
pub struct ParameterBuffer<N: RealField> {
    theta: Rc<RefCell<DVector<N>>>,
}

impl<N: RealField> Clone for ParameterBuffer<N> {
    fn clone(&self) -> Self {
        ParameterBuffer {
            theta: Rc::clone(&self.theta),
        }
    }
}

impl<N: RealField> ParameterBuffer<N> {
    /// A buffer of `size` zero parameters.
    pub fn zeros(size: usize) -> Self {
        ParameterBuffer::from_vector(DVector::zeros(size))
    }

    pub fn from_vector(theta: DVector<N>) -> Self {
        ParameterBuffer {
            theta: Rc::new(RefCell::new(theta)),
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.theta.borrow().nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the parameters for reading.
    pub fn read(&self) -> Ref<'_, DVector<N>> {
        self.theta.borrow()
    }

    /// Copy of the current parameters.
    pub fn snapshot(&self) -> DVector<N> {
        self.theta.borrow().clone()
    }

    /// A new buffer holding a copy of the current parameters, not shared with this one.
    pub fn detached(&self) -> Self {
        ParameterBuffer::from_vector(self.snapshot())
    }

    /// True iff both handles share the same buffer.
    pub fn shares(&self, other: &ParameterBuffer<N>) -> bool {
        Rc::ptr_eq(&self.theta, &other.theta)
    }

    pub(crate) fn write(&self) -> Result<RefMut<'_, DVector<N>>> {
        self.theta.try_borrow_mut().map_err(|_| KtdError::ParameterBufferBusy)
    }
}
