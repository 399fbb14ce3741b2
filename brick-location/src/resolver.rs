//! City resolution over acquisition and reverse geocoding.

use std::sync::{
    Mutex, OnceLock, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use brick_core::{
    ApiKey, Coordinate, GeocodeQuery, LocationSource, ReverseGeocoder, geocode::DEFAULT_LANGUAGE,
};
use log::{debug, warn};
use tokio::sync::watch;

use crate::LocationAcquisition;

/// City reported when resolution fails for any reason.
pub const NO_CITY: &str = "none";

/// Lifecycle of a [`LocationResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// [`LocationResolver::initialize`] has not been called.
    Uninitialized,
    /// Initialised, nothing resolved yet.
    Initialized,
    /// A resolution attempt is in flight.
    Resolving,
    /// The last attempt finished; `None` when it produced [`NO_CITY`].
    Resolved(Option<String>),
}

/// Resolves the device's city and caches the answer.
///
/// Attempts are single-flight: callers queue behind the running attempt and,
/// if one completed while they waited, share its result.
pub struct LocationResolver<S, G> {
    acquisition: LocationAcquisition<S>,
    geocoder: G,
    initialized: AtomicBool,
    api_key: OnceLock<ApiKey>,
    gate: tokio::sync::Mutex<()>,
    completed: AtomicU64,
    phase: Mutex<ResolutionPhase>,
    cache: watch::Sender<Option<String>>,
}

impl<S, G> std::fmt::Debug for LocationResolver<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("initialized", &self.initialized)
            .field("key_bound", &self.api_key.get().is_some())
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<S: LocationSource, G: ReverseGeocoder> LocationResolver<S, G> {
    /// Create a resolver over `source` and `geocoder`.
    #[must_use]
    pub fn new(source: S, geocoder: G) -> Self {
        Self::with_acquisition(LocationAcquisition::new(source), geocoder)
    }

    /// Create a resolver over a preconfigured acquisition layer.
    #[must_use]
    pub fn with_acquisition(acquisition: LocationAcquisition<S>, geocoder: G) -> Self {
        let (cache, _) = watch::channel(None);
        Self {
            acquisition,
            geocoder,
            initialized: AtomicBool::new(false),
            api_key: OnceLock::new(),
            gate: tokio::sync::Mutex::new(()),
            completed: AtomicU64::new(0),
            phase: Mutex::new(ResolutionPhase::Uninitialized),
            cache,
        }
    }

    /// Acquisition layer used by this resolver.
    pub const fn acquisition(&self) -> &LocationAcquisition<S> {
        &self.acquisition
    }

    /// Geocoder used by this resolver.
    pub const fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Bind `api_key` and re-acquire the location client handle.
    ///
    /// The key is taken from the first call only; later calls merely
    /// re-initialise the source. A blank key leaves the resolver without one.
    pub fn initialize(&self, api_key: &str) {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            if self.bind_key(api_key).is_none() {
                warn!("location resolver initialised without an API key");
            }
            self.set_phase_if(&ResolutionPhase::Uninitialized, ResolutionPhase::Initialized);
        }
        self.acquisition.reinitialize();
    }

    /// Record whether location permission is granted.
    ///
    /// Does not start a resolution.
    pub fn update_permission(&self, granted: bool) {
        self.acquisition.update_permission(granted);
    }

    /// Whether permission is currently recorded as granted.
    pub fn has_permission(&self) -> bool {
        self.acquisition.has_permission()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ResolutionPhase {
        self.phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent resolution result, including [`NO_CITY`].
    pub fn cached_city(&self) -> Option<String> {
        self.cache.borrow().clone()
    }

    /// Watch the cached city; the receiver sees every completed attempt.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.cache.subscribe()
    }

    /// Acquire a coordinate once, or `None`.
    pub async fn fetch_lat_lng_once(&self) -> Option<Coordinate> {
        self.acquisition.current_coordinate().await
    }

    /// Resolve the device's city, returning [`NO_CITY`] on any failure.
    ///
    /// `api_key` is bound when no key is bound yet. An empty `language`
    /// falls back to English. The result is cached and published to
    /// subscribers.
    pub async fn resolve_city_assuming_permission(&self, api_key: &str, language: &str) -> String {
        let seen = self.completed.load(Ordering::Acquire);
        let _flight = self.gate.lock().await;
        if self.completed.load(Ordering::Acquire) != seen
            && let Some(city) = self.cached_city()
        {
            debug!("sharing resolution completed while waiting");
            return city;
        }

        let attempt = Attempt::begin(&self.phase);
        let city = self.resolve_uncached(api_key, language).await;
        let resolved = (city != NO_CITY).then(|| city.clone());

        self.cache.send_replace(Some(city.clone()));
        attempt.finish(ResolutionPhase::Resolved(resolved));
        self.completed.fetch_add(1, Ordering::AcqRel);
        city
    }

    async fn resolve_uncached(&self, api_key: &str, language: &str) -> String {
        if !self.has_permission() {
            debug!("location permission not granted");
            return NO_CITY.to_owned();
        }
        let Some(key) = self.bind_key(api_key) else {
            warn!("no geocoding API key is bound");
            return NO_CITY.to_owned();
        };
        let Some(coordinate) = self.acquisition.current_coordinate().await else {
            return NO_CITY.to_owned();
        };

        let language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language
        };
        let query = GeocodeQuery::new(key.clone()).with_language(language);
        match self.geocoder.reverse(coordinate, &query).await {
            Ok(Some(place)) => place.into_string(),
            Ok(None) => {
                debug!("no place name for {coordinate:?}");
                NO_CITY.to_owned()
            }
            Err(err) => {
                warn!("reverse geocoding failed: {err}");
                NO_CITY.to_owned()
            }
        }
    }

    fn bind_key(&self, candidate: &str) -> Option<&ApiKey> {
        if let Some(bound) = self.api_key.get() {
            return Some(bound);
        }
        let key = ApiKey::new(candidate).ok()?;
        Some(self.api_key.get_or_init(|| key))
    }

    fn set_phase_if(&self, expected: &ResolutionPhase, next: ResolutionPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase == *expected {
            *phase = next;
        }
    }
}

/// Marks the phase as [`ResolutionPhase::Resolving`] for one attempt.
///
/// An attempt dropped before [`Attempt::finish`] puts the earlier phase back.
struct Attempt<'a> {
    phase: &'a Mutex<ResolutionPhase>,
    previous: Option<ResolutionPhase>,
}

impl<'a> Attempt<'a> {
    fn begin(phase: &'a Mutex<ResolutionPhase>) -> Self {
        let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *current, ResolutionPhase::Resolving);
        drop(current);
        Self {
            phase,
            previous: Some(previous),
        }
    }

    fn finish(mut self, next: ResolutionPhase) {
        self.previous = None;
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            debug!("resolution attempt abandoned");
            *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = previous;
        }
    }
}
