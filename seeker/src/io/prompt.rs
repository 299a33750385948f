//! Prompt rendering for the flight-search session.

use minijinja::{Environment, context};

const SEARCH_TEMPLATE: &str = include_str!("prompts/search.md");
const SEAT_TEMPLATE: &str = include_str!("prompts/seat.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("search", SEARCH_TEMPLATE)
            .expect("search template should be valid");
        env.add_template("seat", SEAT_TEMPLATE)
            .expect("seat template should be valid");
        Self { env }
    }
}

/// Render the opening search prompt for the given constraints.
pub fn render_search(origin: &str, destination: &str, date: &str) -> String {
    let engine = PromptEngine::new();
    let template = engine
        .env
        .get_template("search")
        .expect("search template is registered");
    template
        .render(context! {
            origin => origin,
            destination => destination,
            date => date,
        })
        .expect("search template rendering should not fail")
}

/// Render the seat-extraction prompt for a free-text operator answer.
pub fn render_seat(answer: &str) -> String {
    let engine = PromptEngine::new();
    let template = engine
        .env
        .get_template("seat")
        .expect("seat template is registered");
    template
        .render(context! { answer => answer.trim() })
        .expect("seat template rendering should not fail")
}
