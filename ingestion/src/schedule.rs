use types::primitives::Epoch;

/// Epochs to process, in the order they are dispatched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EpochSchedule {
    next: Option<Epoch>,
    order: Order,
    remaining: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Order {
    Descending { floor: Epoch },
    Ascending { head: Epoch },
}

impl EpochSchedule {
    /// `head, head - 1, …, floor`.
    #[must_use]
    pub fn descending(head: Epoch, floor: Epoch) -> Self {
        Self {
            next: (floor <= head).then_some(head),
            order: Order::Descending { floor },
            remaining: None,
        }
    }

    /// `start, start + 1, …, head`.
    #[must_use]
    pub fn ascending(start: Epoch, head: Epoch) -> Self {
        Self {
            next: (start <= head).then_some(start),
            order: Order::Ascending { head },
            remaining: None,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.remaining = limit;
        self
    }
}

impl Iterator for EpochSchedule {
    type Item = Epoch;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.checked_sub(1)?;
        }

        let epoch = self.next?;

        self.next = match self.order {
            Order::Descending { floor } => epoch.checked_sub(1).filter(|next| *next >= floor),
            Order::Ascending { head } => epoch.checked_add(1).filter(|next| *next <= head),
        };

        Some(epoch)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(EpochSchedule::descending(5, 1) => vec![5, 4, 3, 2, 1])]
    #[test_case(EpochSchedule::descending(3, 3) => vec![3])]
    #[test_case(EpochSchedule::descending(2, 3) => Vec::<Epoch>::new(); "head below floor")]
    #[test_case(EpochSchedule::descending(2, 0) => vec![2, 1, 0]; "down to genesis")]
    #[test_case(EpochSchedule::descending(100, 1).with_limit(Some(3)) => vec![100, 99, 98])]
    #[test_case(EpochSchedule::descending(100, 1).with_limit(Some(0)) => Vec::<Epoch>::new(); "zero limit")]
    #[test_case(EpochSchedule::ascending(1, 4) => vec![1, 2, 3, 4])]
    #[test_case(EpochSchedule::ascending(5, 4) => Vec::<Epoch>::new(); "start above head")]
    #[test_case(EpochSchedule::ascending(1, 4).with_limit(Some(10)) => vec![1, 2, 3, 4]; "limit above length")]
    #[test_case(EpochSchedule::ascending(u64::MAX - 1, u64::MAX) => vec![u64::MAX - 1, u64::MAX])]
    fn schedule_yields_epochs_in_order(schedule: EpochSchedule) -> Vec<Epoch> {
        schedule.collect()
    }
}
