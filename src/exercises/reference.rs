//! Expected-output producers
//!
//! Exercises name one of these in the catalog (`expected = "..."`). Three kinds exist:
//! - behaviours replay the reference program against the test input,
//! - strategy generators format the answer the way the learner's branching style does,
//! - observation generators pick which of several accepted answers the program printed.

use std::f64::consts::PI;
use std::sync::OnceLock;

use regex::Regex;

use crate::verifier::compare::{extract_numbers, ECHO_TOLERANCE};

/// Hands out test-input lines; an exhausted feed yields empty lines
pub struct InputFeed<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> InputFeed<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines(),
        }
    }

    /// Next line, as a prompt-then-read would receive it
    pub fn read(&mut self, _prompt: &str) -> String {
        self.lines.next().map(|l| l.trim().to_string()).unwrap_or_default()
    }

    /// Next line parsed as a number
    pub fn read_number(&mut self, prompt: &str) -> Option<f64> {
        self.read(prompt).parse().ok()
    }
}

/// Collects the reference program's output lines
#[derive(Default)]
pub struct OutputSink {
    transcript: String,
}

impl OutputSink {
    pub fn say(&mut self, text: impl AsRef<str>) {
        self.transcript.push_str(text.as_ref());
        self.transcript.push(' ');
    }

    pub fn into_transcript(self) -> String {
        self.transcript.trim_end().to_string()
    }
}

/// Branching style detected in the learner's source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStyle {
    /// `switch` with `{n:F2}` placeholders: fixed two decimals
    Switch,
    /// if/else with `Math.Round(x, 2)`: at most two decimals
    IfElse,
}

fn switch_keyword() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bswitch\b").expect("valid switch pattern"))
}

impl BranchStyle {
    pub fn detect(clean_source: &str) -> Self {
        if switch_keyword().is_match(clean_source) {
            BranchStyle::Switch
        } else {
            BranchStyle::IfElse
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            BranchStyle::Switch => format!("{:.2}", value),
            BranchStyle::IfElse => round2(value).to_string(),
        }
    }
}

pub type Behavior = fn(&mut InputFeed, &mut OutputSink);
pub type StrategyGenerator = fn(&str, BranchStyle) -> Option<String>;
pub type ObservedGenerator = fn(&str, &str) -> Option<String>;

/// How the expected transcript of a test case is produced
#[derive(Clone, Copy)]
pub enum ExpectedOutput {
    Behavior(Behavior),
    Strategy(StrategyGenerator),
    Observed(ObservedGenerator),
}

impl std::fmt::Debug for ExpectedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ExpectedOutput::Behavior(_) => "Behavior",
            ExpectedOutput::Strategy(_) => "Strategy",
            ExpectedOutput::Observed(_) => "Observed",
        };
        write!(f, "ExpectedOutput::{}", kind)
    }
}

impl ExpectedOutput {
    /// Expected text for one input; `None` or blank means it cannot be produced
    pub fn expected(&self, input: &str, clean_source: &str, actual: &str) -> Option<String> {
        let text = match self {
            ExpectedOutput::Behavior(behavior) => {
                let mut feed = InputFeed::new(input);
                let mut sink = OutputSink::default();
                behavior(&mut feed, &mut sink);
                sink.into_transcript()
            }
            ExpectedOutput::Strategy(generate) => {
                generate(input, BranchStyle::detect(clean_source))?
            }
            ExpectedOutput::Observed(generate) => generate(input, actual)?,
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Resolve a catalog name
pub fn lookup(name: &str) -> Option<ExpectedOutput> {
    let expected = match name {
        "sphere_volume" => ExpectedOutput::Behavior(sphere_volume),
        "temperature" => ExpectedOutput::Behavior(temperature),
        "two_variables" => ExpectedOutput::Behavior(two_variables),
        "circumference" => ExpectedOutput::Behavior(circumference),
        "purchase_price" => ExpectedOutput::Behavior(purchase_price),
        "eoq" => ExpectedOutput::Behavior(eoq),
        "currency" => ExpectedOutput::Strategy(currency),
        "measurement" => ExpectedOutput::Strategy(measurement),
        "type_conversion" => ExpectedOutput::Observed(type_conversion),
        "radius" => ExpectedOutput::Observed(radius),
        _ => return None,
    };
    Some(expected)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn sphere_volume(input: &mut InputFeed, output: &mut OutputSink) {
    let Some(radius) = input.read_number("Enter radius: ") else {
        return;
    };
    let volume = (4.0 / 3.0) * PI * radius.powi(3);
    output.say(format!(
        "The volume of a sphere with radius {} is {:.2} cubic units.",
        radius, volume
    ));
}

fn temperature(input: &mut InputFeed, output: &mut OutputSink) {
    let choice = input.read("Enter your choice (1 or 2): ");
    match choice.as_str() {
        "1" => {
            let Some(celsius) = input.read_number("Enter temperature in Celsius: ") else {
                return;
            };
            let fahrenheit = celsius * 9.0 / 5.0 + 32.0;
            output.say(format!("{}°C is equal to {:.2}°F", celsius, fahrenheit));
        }
        "2" => {
            let Some(fahrenheit) = input.read_number("Enter temperature in Fahrenheit: ") else {
                return;
            };
            let celsius = (fahrenheit - 32.0) * 5.0 / 9.0;
            output.say(format!("{}°F is equal to {:.2}°C", fahrenheit, celsius));
        }
        _ => output.say("Invalid choice!"),
    }
}

fn two_variables(input: &mut InputFeed, output: &mut OutputSink) {
    let (Some(a), Some(b)) = (
        input.read_number("Enter first number: "),
        input.read_number("Enter second number: "),
    ) else {
        return;
    };
    output.say(format!("Addition: {} + {} = {}", a, b, a + b));
    output.say(format!("Subtraction: {} - {} = {}", a, b, a - b));
    output.say(format!("Multiplication: {} * {} = {}", a, b, a * b));
    if b != 0.0 {
        output.say(format!("Division: {} / {} = {:.2}", a, b, a / b));
    } else {
        output.say("Division by zero is not allowed.");
    }
}

fn circumference(input: &mut InputFeed, output: &mut OutputSink) {
    let Some(radius) = input.read_number("Enter the radius of the circle: ") else {
        return;
    };
    output.say(format!(
        "The circumference of a circle with radius {} is {:.2} units.",
        radius,
        2.0 * PI * radius
    ));
}

fn purchase_price(input: &mut InputFeed, output: &mut OutputSink) {
    let (Some(price), Some(rate)) = (
        input.read_number("Enter the item price: $"),
        input.read_number("Enter the tax rate (%): "),
    ) else {
        return;
    };
    let tax = price * (rate / 100.0);
    output.say(format!("Original price: {:.2}", price));
    output.say(format!("Tax amount ({}%): {:.2}", rate, tax));
    output.say(format!("Total price: {:.2}", price + tax));
}

fn eoq(input: &mut InputFeed, output: &mut OutputSink) {
    let (Some(demand), Some(order_cost), Some(holding_cost)) = (
        input.read_number("Enter annual demand (D): "),
        input.read_number("Enter order cost (S): $"),
        input.read_number("Enter annual holding cost per unit (H): $"),
    ) else {
        return;
    };
    if demand <= 0.0 || order_cost <= 0.0 || holding_cost <= 0.0 {
        output.say("Error: All values must be positive.");
    } else {
        let eoq = ((2.0 * demand * order_cost) / holding_cost).sqrt();
        output.say(format!(
            "The Economic Order Quantity (EOQ) is: {:.2} units",
            eoq
        ));
    }
}

/// `choice\namount`: 1 is PHP to USD at 0.018, 2 is USD to PHP at 56.0
fn currency(input: &str, style: BranchStyle) -> Option<String> {
    const PHP_TO_USD: f64 = 0.018;
    const USD_TO_PHP: f64 = 56.0;

    let mut lines = input.lines().map(str::trim);
    let choice = lines.next()?;
    let amount: f64 = lines.next()?.parse().ok()?;
    let (rate, from, to) = match choice {
        "1" => (PHP_TO_USD, "PHP", "USD"),
        "2" => (USD_TO_PHP, "USD", "PHP"),
        _ => return None,
    };
    Some(format!(
        "Result: {} {} = {} {}",
        amount,
        from,
        style.format(amount * rate),
        to
    ))
}

/// `choice\nvalue`: meters to feet, kilograms to pounds, liters to gallons
fn measurement(input: &str, style: BranchStyle) -> Option<String> {
    let mut lines = input.lines().map(str::trim);
    let choice = lines.next()?;
    let value: f64 = lines.next().unwrap_or("0").parse().ok()?;
    let (factor, from, to) = match choice {
        "1" => (3.28084, "m", "ft"),
        "2" => (2.20462, "kg", "lbs"),
        "3" => (0.264172, "L", "gal"),
        _ => return None,
    };
    Some(format!(
        "Result: {} {} = {} {}",
        value,
        from,
        style.format(value * factor),
        to
    ))
}

/// Non-echo numbers printed by the program
fn printed_results(input: &str, actual: &str) -> Vec<f64> {
    let inputs = extract_numbers(input);
    extract_numbers(actual)
        .into_iter()
        .filter(|n| !inputs.iter().any(|i| (n - i).abs() < ECHO_TOLERANCE))
        .collect()
}

/// A double converted to int: rounding, truncation toward zero and flooring are all accepted
fn type_conversion(input: &str, actual: &str) -> Option<String> {
    let value: f64 = input.trim().parse().ok()?;
    let mut candidates = vec![value.round()];
    for candidate in [value.trunc(), value.floor()] {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    let printed = printed_results(input, actual);
    let shows = |target: f64| printed.iter().any(|n| (n - target).abs() < ECHO_TOLERANCE);

    Some(match candidates.iter().find(|c| shows(**c)) {
        Some(shown) => shown.to_string(),
        None => candidates
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" or "),
    })
}

/// Radius from area; a negative area may be rejected or taken by magnitude
fn radius(input: &str, actual: &str) -> Option<String> {
    let area: f64 = input.trim().parse().ok()?;
    let radius = (area.abs() / PI).sqrt();

    if area >= 0.0 {
        return Some(format!(
            "The radius of a circle with area {} is {:.2} units.",
            area, radius
        ));
    }

    if let Some(keyword) = ["Error", "Negative"].iter().find(|k| actual.contains(*k)) {
        return Some(keyword.to_string());
    }
    let fixed = format!("{:.2}", radius);
    if actual.contains(&fixed) || actual.contains(&round2(radius).to_string()) {
        return Some(fixed);
    }
    Some(format!("Error: Negative Area OR Radius: {}", fixed))
}
