use tracing::{debug, error, info, warn};

use crate::capabilities::{
    first_point, suggestions_from_features, Capabilities, GeocodeResult, LocationOutput,
    RouteResult, WakeLockOutput,
};
use crate::config::NavigationConfig;
use crate::error::NavigationError;
use crate::event::Event;
use crate::geo::{bounding_box_with_padding, LngLat};
use crate::guidance::{self, TurnDisplay};
use crate::model::{
    AppPhase, EndpointKind, NavigationSession, PendingRoute, PositionWatch, RequestId, Route,
    WakeLockState, CURRENT_LOCATION_LABEL,
};
use crate::{EndpointView, ViewModel};

#[derive(Default)]
pub struct App;

impl App {
    fn alert(caps: &Capabilities, error: &NavigationError) {
        warn!(kind = ?error.kind(), "{error}");
        caps.alert.notify(error.user_facing_message());
    }

    // --- Route calculation ---

    fn request_route(model: &mut NavigationSession, caps: &Capabilities, then_begin_guidance: bool) {
        let id = model.issue_request_id();
        model.pending_route = Some(PendingRoute::new(id, then_begin_guidance));
        model.loading_route = true;
        info!(request = id.0, "route requested");
        Self::advance_route_request(model, caps);
    }

    /// Drives the pending request one step: geocode whichever endpoint is
    /// still unresolved, then validate, then ask the router.
    fn advance_route_request(model: &mut NavigationSession, caps: &Capabilities) {
        let Some(mut pending) = model.pending_route else {
            return;
        };
        let id = pending.id;

        for kind in [EndpointKind::From, EndpointKind::To] {
            let geocoded = match kind {
                EndpointKind::From => &mut pending.from_geocoded,
                EndpointKind::To => &mut pending.to_geocoded,
            };
            let endpoint = model.endpoint(kind);
            if *geocoded || endpoint.resolved_location.is_some() || endpoint.text.trim().is_empty()
            {
                continue;
            }

            *geocoded = true;
            let query = endpoint.text.trim().to_string();
            model.pending_route = Some(pending);
            debug!(request = id.0, endpoint = ?kind, "geocoding endpoint");
            caps.geocoder.search(
                query,
                model.position,
                model.config.geocode_limit,
                move |result: GeocodeResult| Event::Geocoded {
                    request: id,
                    endpoint: kind,
                    result: Box::new(result),
                },
            );
            return;
        }

        let Some(from) = model.from.resolved_location else {
            let text = model.from.text.clone();
            Self::complete_route_request(model, caps);
            Self::alert(caps, &NavigationError::OriginNotFound(text));
            return;
        };
        let Some(to) = model.to.resolved_location else {
            let text = model.to.text.clone();
            Self::complete_route_request(model, caps);
            Self::alert(caps, &NavigationError::DestinationNotFound(text));
            return;
        };
        let Some(profile) = model.profile else {
            Self::complete_route_request(model, caps);
            Self::alert(caps, &NavigationError::ProfileNotSelected);
            return;
        };

        pending.endpoints = Some((from, to));
        model.pending_route = Some(pending);
        info!(request = id.0, ?profile, "fetching route");
        caps.routing
            .fetch(from, to, profile, move |result: RouteResult| Event::RouteFetched {
                request: id,
                result: Box::new(result),
            });
    }

    /// Every exit from a route request goes through here.
    fn complete_route_request(model: &mut NavigationSession, caps: &Capabilities) {
        let pending = model.pending_route.take();
        model.loading_route = false;
        if pending.is_some_and(|p| p.then_begin_guidance) {
            Self::begin_active_guidance(model, caps);
        }
    }

    fn on_geocoded(
        model: &mut NavigationSession,
        caps: &Capabilities,
        request: RequestId,
        endpoint: EndpointKind,
        result: GeocodeResult,
    ) {
        if !model.is_current_request(request) {
            debug!(request = request.0, "dropping stale geocoding response");
            return;
        }
        match result {
            Ok(features) => {
                if let Some(location) = first_point(&features) {
                    model.endpoint_mut(endpoint).resolved_location = Some(location);
                } else {
                    debug!(endpoint = ?endpoint, "geocoder found no match");
                }
                Self::advance_route_request(model, caps);
            }
            Err(e) => {
                error!(error = %e, endpoint = ?endpoint, "geocoding failed");
                Self::complete_route_request(model, caps);
                Self::alert(caps, &NavigationError::RouteCalculationFailed);
            }
        }
    }

    fn on_route_fetched(
        model: &mut NavigationSession,
        caps: &Capabilities,
        request: RequestId,
        result: RouteResult,
    ) {
        if !model.is_current_request(request) {
            debug!(request = request.0, "dropping stale route response");
            return;
        }
        let endpoints = model.pending_route.and_then(|p| p.endpoints);

        match (result, endpoints) {
            (Ok(response), Some((from, to))) => match Route::from_response(from, to, response) {
                Ok(route) => {
                    let bounds = bounding_box_with_padding(route.geometry(), model.config.bounds_padding);
                    info!(
                        points = route.geometry().len(),
                        turns = route.turn_instructions().len(),
                        "route loaded"
                    );
                    model.replace_route(route, bounds);
                    model.set_phase(AppPhase::DisplayingRoute);
                }
                Err(e) => warn!(error = %e, "route response carries no usable route"),
            },
            (Ok(_), None) => error!("route response without dispatched endpoints"),
            (Err(e), _) => {
                error!(error = %e, "route request failed");
                Self::alert(caps, &NavigationError::RouteCalculationFailed);
            }
        }

        Self::complete_route_request(model, caps);
    }

    // --- Guidance lifecycle ---

    fn begin_active_guidance(model: &mut NavigationSession, caps: &Capabilities) {
        if !matches!(model.phase, AppPhase::DisplayingRoute | AppPhase::Routing) {
            warn!(phase = ?model.phase, "no route to guide along");
            return;
        }

        Self::ensure_position_watch(model, caps);
        Self::ensure_wake_lock(model, caps);
        model.set_phase(AppPhase::Routing);

        let arrived = match model.position {
            Some(position) => guidance::on_position_update(model, position, None).arrived,
            None => {
                if let Some(start) = model.route().and_then(Route::first_point) {
                    model.camera.center = start;
                }
                false
            }
        };
        model.camera.zoom = model.config.navigation_zoom;
        model.camera.pitch = model.config.navigation_pitch;

        if arrived {
            info!("started guidance at the destination");
            Self::finish_guidance(model, caps);
        }
    }

    fn finish_guidance(model: &mut NavigationSession, caps: &Capabilities) {
        if !model.phase.follows_position() {
            warn!(phase = ?model.phase, "guidance is not active");
            return;
        }

        model.invalidate_requests();
        model.set_phase(AppPhase::FinishedRouting);
        model.clear_route();
        model.set_off_path(false);
        model.set_turn_display(TurnDisplay::default());
        model.camera.zoom = model.config.navigation_zoom;
        model.camera.bearing = 0.0;
        model.camera.pitch = 0.0;

        Self::release_wake_lock(model, caps);
        Self::stop_position_watch(model, caps);
        info!("guidance finished");
    }

    fn reset_to_home(model: &mut NavigationSession, caps: &Capabilities) {
        model.invalidate_requests();
        model.set_phase(AppPhase::SearchingRoute);

        if let Some(position) = model.position {
            model.camera.center = position;
        }
        model.camera.zoom = model.config.default_zoom;
        model.camera.bearing = 0.0;
        model.camera.pitch = 0.0;

        model.from.clear();
        model.to.clear();
        model.clear_route();
        model.bounds = None;
        model.set_off_path(false);
        model.set_turn_display(TurnDisplay::default());
        model.pending_snap = None;

        Self::release_wake_lock(model, caps);
        Self::stop_position_watch(model, caps);
    }

    fn recalculate(model: &mut NavigationSession, caps: &Capabilities) {
        if model.phase != AppPhase::Routing {
            debug!(phase = ?model.phase, "recalculation ignored outside guidance");
            return;
        }
        let Some(position) = model.position else {
            Self::alert(caps, &NavigationError::PositionUnknownForRecalculation);
            return;
        };

        info!("recalculating route from current position");
        model.from.snap_to(CURRENT_LOCATION_LABEL, position);
        model.set_off_path(false);
        Self::request_route(model, caps, true);
    }

    // --- Device resources ---

    fn ensure_position_watch(model: &mut NavigationSession, caps: &Capabilities) {
        if model.position_watch != PositionWatch::Inactive {
            return;
        }
        model.position_watch = PositionWatch::Starting;
        model.loading_gps = true;
        caps.location.start_watch(model.config.watch, Event::WatchStarted);
    }

    fn stop_position_watch(model: &mut NavigationSession, caps: &Capabilities) {
        match std::mem::take(&mut model.position_watch) {
            PositionWatch::Active(watch) => {
                debug!(watch = watch.0, "stopping position watch");
                caps.location.stop_watch(watch);
            }
            PositionWatch::Starting | PositionWatch::Inactive => {}
        }
        model.loading_gps = false;
    }

    fn on_watch_started(model: &mut NavigationSession, caps: &Capabilities, output: LocationOutput) {
        match (output, model.position_watch) {
            (LocationOutput::WatchStarted(watch), PositionWatch::Starting) => {
                debug!(watch = watch.0, "position watch active");
                model.position_watch = PositionWatch::Active(watch);
            }
            (LocationOutput::WatchStarted(watch), _) => {
                debug!(watch = watch.0, "releasing position watch that is no longer needed");
                caps.location.stop_watch(watch);
            }
            (LocationOutput::Unsupported, PositionWatch::Starting) => {
                model.position_watch = PositionWatch::Inactive;
                model.loading_gps = false;
                model.pending_snap = None;
                Self::alert(caps, &NavigationError::GeolocationUnsupported);
            }
            (LocationOutput::Unsupported | LocationOutput::WatchStopped, _) => {}
        }
    }

    fn ensure_wake_lock(model: &mut NavigationSession, caps: &Capabilities) {
        if model.wake_lock != WakeLockState::Released {
            return;
        }
        model.wake_lock = WakeLockState::Acquiring;
        caps.wake_lock.acquire(Event::WakeLockChanged);
    }

    fn release_wake_lock(model: &mut NavigationSession, caps: &Capabilities) {
        if let WakeLockState::Held(lock) = std::mem::take(&mut model.wake_lock) {
            debug!(lock = lock.0, "releasing wake lock");
            caps.wake_lock.release(lock);
        }
    }

    fn on_wake_lock_changed(model: &mut NavigationSession, caps: &Capabilities, output: WakeLockOutput) {
        match (output, model.wake_lock) {
            (WakeLockOutput::Acquired(lock), WakeLockState::Acquiring) => {
                debug!(lock = lock.0, "wake lock held");
                model.wake_lock = WakeLockState::Held(lock);
            }
            (WakeLockOutput::Acquired(lock), _) => {
                debug!(lock = lock.0, "releasing wake lock that is no longer needed");
                caps.wake_lock.release(lock);
            }
            (WakeLockOutput::Unavailable(reason), WakeLockState::Acquiring) => {
                warn!(%reason, "wake lock unavailable");
                model.wake_lock = WakeLockState::Released;
            }
            (WakeLockOutput::Unavailable(_) | WakeLockOutput::Released, _) => {}
        }
    }

    // --- Positions ---

    fn apply_position(
        model: &mut NavigationSession,
        caps: &Capabilities,
        position: LngLat,
        heading: Option<f64>,
    ) {
        let outcome = guidance::on_position_update(model, position, heading);

        if let Some(kind) = model.pending_snap.take() {
            model.endpoint_mut(kind).snap_to(CURRENT_LOCATION_LABEL, position);
        }
        if outcome.arrived {
            info!("arrived at destination");
            Self::finish_guidance(model, caps);
        }
    }

    fn use_current_position(model: &mut NavigationSession, caps: &Capabilities, kind: EndpointKind) {
        Self::ensure_position_watch(model, caps);

        if let Some(position) = model.position {
            model.endpoint_mut(kind).snap_to(CURRENT_LOCATION_LABEL, position);
        } else if model.loading_gps {
            debug!(endpoint = ?kind, "waiting for first fix");
            model.pending_snap = Some(kind);
        } else {
            Self::alert(caps, &NavigationError::PositionUnavailable);
        }
    }

    fn request_suggestions(model: &mut NavigationSession, caps: &Capabilities, kind: EndpointKind) {
        let query = model.endpoint(kind).text.trim().to_string();
        if query.is_empty() {
            model.endpoint_mut(kind).suggestions.clear();
            return;
        }

        model.endpoint_mut(kind).loading_suggestion = true;
        let epoch = model.epoch;
        caps.geocoder.search(
            query,
            model.position,
            model.config.suggestion_limit,
            move |result: GeocodeResult| Event::SuggestionsFetched {
                endpoint: kind,
                epoch,
                result: Box::new(result),
            },
        );
    }
}

fn valid_position(position: LngLat) -> Option<LngLat> {
    match LngLat::new(position.lng, position.lat) {
        Ok(position) => Some(position),
        Err(e) => {
            warn!(error = %e, "ignoring invalid position");
            None
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = NavigationSession;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut NavigationSession, caps: &Capabilities) {
        match event {
            Event::ConfigurationLoaded { json } => match NavigationConfig::from_json(&json) {
                Ok(config) => {
                    info!(simulation = config.simulation_mode, "configuration loaded");
                    model.config = config;
                }
                Err(e) => error!(error = %e, "configuration rejected"),
            },

            Event::EndpointTextChanged { endpoint, text } => {
                model.endpoint_mut(endpoint).edit(text);
            }

            Event::EndpointFocused { endpoint } => {
                model.endpoint_mut(endpoint).focused = true;
                model.endpoint_mut(endpoint.other()).focused = false;
            }

            Event::SuggestionsRequested { endpoint } => {
                Self::request_suggestions(model, caps, endpoint);
            }

            Event::SuggestionsFetched {
                endpoint,
                epoch,
                result,
            } => {
                if epoch != model.epoch {
                    debug!(epoch, "dropping stale suggestions");
                    return;
                }
                let input = model.endpoint_mut(endpoint);
                input.loading_suggestion = false;
                match *result {
                    Ok(features) => input.suggestions = suggestions_from_features(&features),
                    Err(e) => {
                        warn!(error = %e, "suggestion lookup failed");
                        input.suggestions.clear();
                    }
                }
            }

            Event::SuggestionSelected { endpoint, index } => {
                let input = model.endpoint_mut(endpoint);
                match input.suggestions.get(index).cloned() {
                    Some(suggestion) => input.apply_suggestion(suggestion),
                    None => warn!(index, "suggestion index out of range"),
                }
            }

            Event::UseCurrentPosition { endpoint } => {
                Self::use_current_position(model, caps, endpoint);
            }

            Event::ProfileSelected { profile } => {
                model.profile = Some(profile);
            }

            Event::CameraMoved {
                center,
                zoom,
                bearing,
                pitch,
            } => {
                if let Some(center) = valid_position(center) {
                    model.camera.center = center;
                }
                if zoom.is_finite() {
                    model.camera.zoom = model.config.clamp_zoom(zoom);
                }
                if bearing.is_finite() {
                    model.camera.bearing = bearing.rem_euclid(360.0);
                }
                if pitch.is_finite() {
                    model.camera.pitch = pitch;
                }
            }

            Event::RouteRequested => {
                if model.loading_route {
                    debug!("route request already in flight");
                    return;
                }
                Self::request_route(model, caps, false);
            }

            Event::Geocoded {
                request,
                endpoint,
                result,
            } => Self::on_geocoded(model, caps, request, endpoint, *result),

            Event::RouteFetched { request, result } => {
                Self::on_route_fetched(model, caps, request, *result);
            }

            Event::StartNavigation => Self::begin_active_guidance(model, caps),
            Event::FinishNavigation => Self::finish_guidance(model, caps),
            Event::ResetToHome => Self::reset_to_home(model, caps),
            Event::RecalculateRoute => Self::recalculate(model, caps),

            Event::WatchStarted(output) => Self::on_watch_started(model, caps, output),
            Event::WakeLockChanged(output) => Self::on_wake_lock_changed(model, caps, output),

            Event::PositionChanged {
                watch,
                position,
                heading,
            } => {
                if model.position_watch != PositionWatch::Active(watch) {
                    debug!(watch = watch.0, "dropping fix from inactive watch");
                    return;
                }
                let Some(position) = valid_position(position) else {
                    return;
                };
                if model.config.simulation_mode && model.position.is_some() {
                    return;
                }
                model.loading_gps = false;
                Self::apply_position(model, caps, position, heading.filter(|h| h.is_finite()));
            }

            Event::PositionFailed { watch, message } => {
                warn!(watch = watch.0, %message, "position fix failed");
                if model.position_watch != PositionWatch::Active(watch) {
                    return;
                }
                model.loading_gps = false;
                if model.pending_snap.take().is_some() {
                    Self::alert(caps, &NavigationError::PositionUnavailable);
                }
            }

            Event::PositionOverridden { position } => {
                if let Some(position) = valid_position(position) {
                    Self::apply_position(model, caps, position, None);
                }
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &NavigationSession) -> ViewModel {
        let route = model.route();
        let display = model.turn_display();

        ViewModel {
            phase: model.phase(),
            camera: *model.camera(),
            bounds: model.bounds(),
            route_line: route.map(Route::line_string),
            turn_markers: model.turn_instructions().to_vec(),
            turn_icon: display.icon.icon_name().to_string(),
            turn_text: display.text.clone(),
            is_off_path: model.is_off_path(),
            user_position: model.position(),
            user_heading: model.heading(),
            from: EndpointView::from(model.endpoint(EndpointKind::From)),
            to: EndpointView::from(model.endpoint(EndpointKind::To)),
            profile: model.profile(),
            loading_route: model.is_loading_route(),
            loading_gps: model.is_loading_gps(),
            can_request_route: !model.is_loading_route()
                && model.profile().is_some()
                && [EndpointKind::From, EndpointKind::To].iter().all(|kind| {
                    let endpoint = model.endpoint(*kind);
                    endpoint.resolved_location.is_some() || !endpoint.text.trim().is_empty()
                }),
        }
    }
}
