//! Bootstrap of the next state value.
//!
//! KTD-Q and KTD-SARSA only differ in the value of the next state that is discounted from each sigma point image.

use na::{DVector, RealField};
use nalgebra as na;

use crate::models::ActionValue;

/// Next state value of a transition (s, a, r, s', a').
#[derive(Clone, Debug, PartialEq)]
pub enum Bootstrap<A> {
    /// KTD-Q: off-policy greedy bootstrap, max over the action set of q(theta, s', a). The next action is ignored.
    Greedy(Vec<A>),
    /// KTD-SARSA: on-policy bootstrap, q(theta, s', a') with the next action selected by the behaviour policy.
    OnPolicy,
}

impl<A> Bootstrap<A> {
    /// Value of the next state under parameters `theta`.
    pub fn next_value<N, S, Q>(&self, q: &Q, theta: &DVector<N>, s_next: &S, a_next: &A) -> N
    where
        N: RealField,
        Q: ActionValue<N, S, A>,
    {
        match self {
            Bootstrap::Greedy(actions) => max_over(q, theta, s_next, actions)
                .map(|(_, value)| value)
                .unwrap_or_else(N::zero),
            Bootstrap::OnPolicy => q.value(theta, s_next, a_next),
        }
    }

    /// The action set of a greedy bootstrap.
    pub fn actions(&self) -> Option<&[A]> {
        match self {
            Bootstrap::Greedy(actions) => Some(actions.as_slice()),
            Bootstrap::OnPolicy => None,
        }
    }
}

/// Argmax and max of q(theta, s, a) over the actions. The first maximum found wins ties.
///
/// None for an empty action set.
pub fn max_over<'a, N, S, A, Q>(q: &Q, theta: &DVector<N>, s: &S, actions: &'a [A]) -> Option<(&'a A, N)>
where
    N: RealField,
    Q: ActionValue<N, S, A>,
{
    let mut best: Option<(&'a A, N)> = None;
    for a in actions {
        let value = q.value(theta, s, a);
        let better = match best {
            Some((_, max)) => value > max,
            None => true,
        };
        if better {
            best = Some((a, value));
        }
    }
    best
}
