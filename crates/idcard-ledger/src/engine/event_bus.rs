//! Broadcast channel for ledger events.

use idcard_types::LedgerEvent;
use tokio::sync::broadcast;

/// Fan-out bus for `LedgerEvent`s.
///
/// Cloning shares the underlying channel. Publishing with no subscribers is
/// not an error; slow subscribers lose the oldest events once `capacity` is
/// exceeded.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event` and returns how many subscribers received it.
	pub fn publish(&self, event: LedgerEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use idcard_types::{Address, LedgerCall};

	#[tokio::test]
	async fn test_publish_reaches_subscribers() {
		let bus = EventBus::new(8);
		assert_eq!(
			bus.publish(LedgerEvent::Rejected {
				recipient: Address::ZERO,
				call: LedgerCall::Mint,
				reason: "nobody listening".into(),
			}),
			0
		);

		let mut rx = bus.clone().subscribe();
		let event = LedgerEvent::Rejected {
			recipient: Address::ZERO,
			call: LedgerCall::Burn,
			reason: "No balance to burn".into(),
		};
		assert_eq!(bus.publish(event.clone()), 1);
		assert_eq!(rx.recv().await.unwrap(), event);
	}
}
