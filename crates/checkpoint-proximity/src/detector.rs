//! The Beacon Proximity Detector.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use checkpoint_hardware::{Advertisement, BeaconRadio, DeviceFilter, HardwareError, Subscription};
use checkpoint_protocol::{LocationId, SignalSample};
use futures_util::Stream;

use crate::{
    BeaconDirectory, MANUAL_OVERRIDE_RSSI_DBM, Presence, PresenceSource, ProximityEvent, classify,
};

/// Starts proximity scans against a [`BeaconRadio`].
pub struct ProximityDetector<R> {
    radio: R,
    directory: Arc<BeaconDirectory>,
    filter: DeviceFilter,
}

impl<R: BeaconRadio> ProximityDetector<R> {
    pub fn new(radio: R, directory: BeaconDirectory) -> Self {
        Self {
            radio,
            directory: Arc::new(directory),
            filter: DeviceFilter::default(),
        }
    }

    /// Overrides which devices the platform chooser offers.
    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Pairs with a beacon and starts a fresh scan.
    ///
    /// Never fails: hardware problems become events on the returned scan.
    ///
    /// - Device request refused → a single terminal `Unavailable`.
    /// - Advertisement watching unsupported → a single `InRange` with
    ///   [`PresenceSource::LinkFallback`]; the established link is taken
    ///   as proof of presence.
    /// - Otherwise → one classified event per advertisement, until
    ///   stopped or a terminal event.
    pub async fn start_scan(&self, required: Option<LocationId>) -> ProximityScan {
        let device = match self.radio.request_device(&self.filter).await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(error = %e, "beacon device unavailable");
                return ProximityScan::single(ProximityEvent::Unavailable(e));
            }
        };

        match self.radio.watch_advertisements(device).await {
            Ok(subscription) => {
                tracing::info!(%device, required = ?required, "proximity scan started");
                ProximityScan {
                    source: ScanSource::Live(subscription),
                    required,
                    directory: Arc::clone(&self.directory),
                    finished: false,
                }
            }
            Err(HardwareError::Unsupported(reason)) => {
                tracing::warn!(
                    %device,
                    %reason,
                    "advertisement watching unsupported; accepting device link as presence"
                );
                ProximityScan::single(ProximityEvent::InRange(Presence {
                    rssi: None,
                    location: required,
                    source: PresenceSource::LinkFallback,
                }))
            }
            Err(e) => {
                tracing::warn!(%device, error = %e, "advertisement watch failed");
                ProximityScan::single(ProximityEvent::Unavailable(e))
            }
        }
    }

    /// Synthesizes presence for environments without beacon hardware.
    ///
    /// The event is tagged [`PresenceSource::ManualOverride`] and carries a
    /// fixed plausible reading; it is not equivalent to a measurement.
    pub fn manual_override(&self, required: Option<LocationId>) -> ProximityEvent {
        tracing::warn!(required = ?required, "proximity manually overridden");
        ProximityEvent::InRange(Presence {
            rssi: Some(MANUAL_OVERRIDE_RSSI_DBM),
            location: required,
            source: PresenceSource::ManualOverride,
        })
    }
}

enum ScanSource {
    Live(Subscription<Advertisement>),
    Single(Option<ProximityEvent>),
}

/// One scan session: a stream of classified [`ProximityEvent`]s.
///
/// A live scan runs until [`stop`](Self::stop) is called, the scan is
/// dropped, or a terminal event (`WrongLocation`, `Unavailable`) has been
/// yielded. Scans can't be restarted; start a new one instead.
pub struct ProximityScan {
    source: ScanSource,
    required: Option<LocationId>,
    directory: Arc<BeaconDirectory>,
    finished: bool,
}

impl ProximityScan {
    fn single(event: ProximityEvent) -> Self {
        Self {
            source: ScanSource::Single(Some(event)),
            required: None,
            directory: Arc::default(),
            finished: false,
        }
    }

    /// Stops the scan and releases the radio subscription. Idempotent.
    pub fn stop(&mut self) {
        if !self.finished {
            tracing::debug!("proximity scan stopped");
        }
        self.finish();
    }

    /// Whether events come from a live advertisement watch.
    pub fn is_live(&self) -> bool {
        matches!(self.source, ScanSource::Live(_))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        if let ScanSource::Live(sub) = &mut self.source {
            sub.cancel();
        }
    }

    fn sample(&self, advertisement: Advertisement) -> SignalSample {
        SignalSample {
            rssi: advertisement.rssi,
            location_hint: self
                .directory
                .location_hint(&advertisement.manufacturer_data),
            timestamp_ms: advertisement.timestamp_ms,
        }
    }
}

impl Stream for ProximityScan {
    type Item = ProximityEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ProximityEvent>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let event = match &mut this.source {
            ScanSource::Single(event) => event.take(),
            ScanSource::Live(sub) => match Pin::new(sub).poll_next(cx) {
                Poll::Ready(Some(advertisement)) => {
                    let sample = this.sample(advertisement);
                    let event = classify(&sample, this.required.as_ref());
                    tracing::trace!(
                        rssi = sample.rssi,
                        hint = ?sample.location_hint,
                        ?event,
                        "beacon sample classified"
                    );
                    Some(event)
                }
                Poll::Ready(None) => None,
                Poll::Pending => return Poll::Pending,
            },
        };

        match &event {
            Some(e) if !e.is_terminal() && this.is_live() => {}
            _ => this.finish(),
        }
        Poll::Ready(event)
    }
}
