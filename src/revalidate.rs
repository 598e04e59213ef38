//! Cache invalidation signals.
//!
//! After a service changes, the paths that render it are published on a
//! broadcast channel. Subscribers (a CDN purger, a page cache) decide what
//! to do with them; with no subscribers the signal is only logged.

use tokio::sync::broadcast;

use crate::route::service::model::Service;

const CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Revalidator {
	sender: broadcast::Sender<String>,
}

impl Default for Revalidator {
	fn default() -> Self {
		Self::new()
	}
}

impl Revalidator {
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(CAPACITY);

		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<String> {
		self.sender.subscribe()
	}

	pub fn revalidate(&self, path: String) {
		tracing::info!(%path, "revalidating path");

		// an error only means nobody is listening
		let _ = self.sender.send(path);
	}

	/// Signals the detail page of the service and the dashboard.
	pub fn service_updated(&self, service: &Service) {
		self.revalidate(format!("/{}/{}", service.category, service.slug));
		self.revalidate("/".into());
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test::service;

	#[tokio::test]
	async fn test_service_updated_signals_detail_and_dashboard() {
		let revalidator = Revalidator::new();
		let mut receiver = revalidator.subscribe();

		revalidator.service_updated(&service("s3", "Storage"));

		assert_eq!(receiver.recv().await.unwrap(), "/Storage/s3");
		assert_eq!(receiver.recv().await.unwrap(), "/");
	}

	#[test]
	fn test_no_subscribers_is_fine() {
		Revalidator::new().revalidate("/".into());
	}
}
