// map.rs
use log::{error, info};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Mutex;

/// Callback the chat side uses to ask the map to show a place.
///
/// The caller never waits on it and ignores whatever it does.
pub type MapZoomNotifier = Rc<dyn Fn(&str)>;

/// Serialises swaps of the process-wide panic hook.
static PANIC_HOOK: Mutex<()> = Mutex::new(());

/// Invokes `notifier` so that a panic inside the map cannot reach the caller.
///
/// The default panic hook would print over the TUI, so it is replaced by a
/// silent one for the duration of the call and the panic goes to the log.
///
/// # Returns
/// * `true` if the notifier ran to completion.
pub fn notify_isolated(notifier: &MapZoomNotifier, location: &str) -> bool {
    let outcome = {
        let _lock = PANIC_HOOK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| notifier(location)));
        panic::set_hook(previous);
        outcome
    };

    match outcome {
        Ok(()) => true,
        Err(payload) => {
            error!(
                "map notifier panicked while zooming to '{}': {}",
                location,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// A named place the map knows how to frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Place {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    /// Half-width of the view in degrees of longitude.
    pub span: f64,
}

const GAZETTEER: &[Place] = &[
    Place { name: "Bay of Bengal", lat: 15.0, lon: 88.0, span: 12.0 },
    Place { name: "Arabian Sea", lat: 15.0, lon: 65.0, span: 14.0 },
    Place { name: "Andaman Sea", lat: 10.0, lon: 96.0, span: 7.0 },
    Place { name: "Laccadive Sea", lat: 10.0, lon: 75.0, span: 6.0 },
    Place { name: "Gulf of Mannar", lat: 8.5, lon: 79.0, span: 3.0 },
    Place { name: "Indian Ocean", lat: -20.0, lon: 80.0, span: 50.0 },
    Place { name: "Pacific Ocean", lat: 0.0, lon: -160.0, span: 70.0 },
    Place { name: "Atlantic Ocean", lat: 10.0, lon: -35.0, span: 50.0 },
    Place { name: "Southern Ocean", lat: -60.0, lon: 20.0, span: 90.0 },
    Place { name: "Arctic Ocean", lat: 80.0, lon: 0.0, span: 90.0 },
    Place { name: "Mediterranean Sea", lat: 35.0, lon: 18.0, span: 20.0 },
    Place { name: "Red Sea", lat: 20.0, lon: 38.5, span: 8.0 },
    Place { name: "Persian Gulf", lat: 26.5, lon: 52.5, span: 5.0 },
    Place { name: "South China Sea", lat: 12.0, lon: 113.0, span: 12.0 },
    Place { name: "Gulf of Mexico", lat: 25.0, lon: -90.0, span: 10.0 },
    Place { name: "Caribbean Sea", lat: 15.0, lon: -75.0, span: 12.0 },
    Place { name: "Chennai", lat: 13.08, lon: 80.27, span: 3.0 },
    Place { name: "Mumbai", lat: 19.07, lon: 72.88, span: 3.0 },
    Place { name: "Kochi", lat: 9.93, lon: 76.26, span: 3.0 },
    Place { name: "Visakhapatnam", lat: 17.69, lon: 83.22, span: 3.0 },
    Place { name: "Sri Lanka", lat: 7.8, lon: 80.7, span: 4.0 },
    Place { name: "Maldives", lat: 3.2, lon: 73.2, span: 4.0 },
    Place { name: "India", lat: 21.0, lon: 78.0, span: 16.0 },
];

/// Words that name a kind of feature rather than a particular one.
const GENERIC_WORDS: &[&str] = &[
    "bay", "gulf", "sea", "ocean", "strait", "coast", "north", "south", "east", "west",
];

/// Finds a place by name, ignoring case, a leading "the" and surrounding
/// whitespace. A single distinctive word matches an ocean or sea:
/// "Pacific" finds "Pacific Ocean", "Gulf" finds nothing.
pub fn lookup_place(name: &str) -> Option<Place> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }

    GAZETTEER
        .iter()
        .find(|p| normalize(p.name) == wanted)
        .or_else(|| {
            if wanted.contains(' ') || GENERIC_WORDS.contains(&wanted.as_str()) {
                return None;
            }
            let ocean = format!("{} ocean", wanted);
            let sea = format!("{} sea", wanted);
            GAZETTEER.iter().find(|p| {
                let full = normalize(p.name);
                full == ocean || full == sea
            })
        })
        .copied()
}

fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_prefix("the ")
        .unwrap_or(&lower)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The map panel's viewport. Lives next to the chat and is driven only
/// through [`MapView::zoom_to_location`].
#[derive(Debug, Clone, Default)]
pub struct MapView {
    focus: Option<Place>,
    last_request: Option<String>,
    unresolved: bool,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames the named place if it is known; otherwise keeps the current view
    /// and remembers the request as unresolved.
    pub fn zoom_to_location(&mut self, name: &str) {
        self.last_request = Some(name.to_string());
        match lookup_place(name) {
            Some(place) => {
                info!("map zooming to {} ({}, {})", place.name, place.lat, place.lon);
                self.focus = Some(place);
                self.unresolved = false;
            }
            None => {
                info!("map has no coordinates for '{}'", name);
                self.unresolved = true;
            }
        }
    }

    pub fn focus(&self) -> Option<&Place> {
        self.focus.as_ref()
    }

    pub fn last_request(&self) -> Option<&str> {
        self.last_request.as_deref()
    }

    pub fn is_unresolved(&self) -> bool {
        self.unresolved
    }

    /// Longitude and latitude bounds to draw, world view when unfocused.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        match &self.focus {
            Some(place) => {
                let lat_span = place.span / 2.0;
                (
                    [
                        (place.lon - place.span).max(-180.0),
                        (place.lon + place.span).min(180.0),
                    ],
                    [
                        (place.lat - lat_span).max(-90.0),
                        (place.lat + lat_span).min(90.0),
                    ],
                )
            }
            None => ([-180.0, 180.0], [-90.0, 90.0]),
        }
    }

    /// Title line for the map panel.
    pub fn caption(&self) -> String {
        match (&self.focus, &self.last_request, self.unresolved) {
            (_, Some(request), true) => format!("Map - '{}' not found", request),
            (Some(place), _, false) => format!("Map - {}", place.name),
            _ => "Map - World".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_lookup_is_forgiving() {
        assert_eq!(lookup_place("bay of bengal").map(|p| p.name), Some("Bay of Bengal"));
        assert_eq!(lookup_place("  The  Arabian   Sea ").map(|p| p.name), Some("Arabian Sea"));
        assert_eq!(lookup_place("Pacific").map(|p| p.name), Some("Pacific Ocean"));
        assert_eq!(lookup_place("Atlantis"), None);
        assert_eq!(lookup_place("   "), None);
    }

    #[test]
    fn test_lookup_ignores_generic_words() {
        assert_eq!(lookup_place("Arabian").map(|p| p.name), Some("Arabian Sea"));
        assert_eq!(lookup_place("the Caribbean").map(|p| p.name), Some("Caribbean Sea"));
        for generic in ["Gulf", "Bay", "South", "sea", "Ocean"] {
            assert_eq!(lookup_place(generic), None, "{} matched a place", generic);
        }
        assert_eq!(lookup_place("South China"), None);
    }

    #[test]
    fn test_zoom_to_known_place() {
        let mut map = MapView::new();
        assert_eq!(map.bounds(), ([-180.0, 180.0], [-90.0, 90.0]));
        assert_eq!(map.caption(), "Map - World");

        map.zoom_to_location("Bay of Bengal");
        let (x, y) = map.bounds();
        assert_eq!(x, [76.0, 100.0]);
        assert_eq!(y, [9.0, 21.0]);
        assert_eq!(map.caption(), "Map - Bay of Bengal");
        assert!(!map.is_unresolved());
    }

    #[test]
    fn test_unknown_place_keeps_previous_view() {
        let mut map = MapView::new();
        map.zoom_to_location("Red Sea");
        map.zoom_to_location("Mariana Ridge 7");

        assert_eq!(map.focus().map(|p| p.name), Some("Red Sea"));
        assert_eq!(map.last_request(), Some("Mariana Ridge 7"));
        assert!(map.is_unresolved());
        assert_eq!(map.caption(), "Map - 'Mariana Ridge 7' not found");
    }

    #[test]
    fn test_bounds_are_clamped() {
        let mut map = MapView::new();
        map.zoom_to_location("Arctic Ocean");
        let (x, y) = map.bounds();
        assert_eq!(x, [-90.0, 90.0]);
        assert_eq!(y, [35.0, 90.0]);
    }

    #[test]
    fn test_notify_isolated_runs_callback() {
        let map = Rc::new(RefCell::new(MapView::new()));
        let target = Rc::clone(&map);
        let notifier: MapZoomNotifier = Rc::new(move |loc: &str| target.borrow_mut().zoom_to_location(loc));

        assert!(notify_isolated(&notifier, "Chennai"));
        assert_eq!(map.borrow().focus().map(|p| p.name), Some("Chennai"));
    }

    #[test]
    fn test_notify_isolated_contains_panics() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let notifier: MapZoomNotifier = Rc::new(move |_loc: &str| {
            counter.set(counter.get() + 1);
            panic!("map widget exploded");
        });

        assert!(!notify_isolated(&notifier, "Red Sea"));
        assert_eq!(calls.get(), 1);

        // The map keeps working after a panic.
        assert!(!notify_isolated(&notifier, "Red Sea"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_panic_message_reads_payload() {
        let payload = panic::catch_unwind(|| panic!("map widget exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "map widget exploded");

        let payload = panic::catch_unwind(|| panic!("lost {} tiles", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "lost 3 tiles");

        let payload = panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
