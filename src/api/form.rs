//! Single-passenger form: bounded fields from flags or an interactive prompt.
//!
//! Fields given on the command line are used as-is; the rest are asked for on
//! the terminal, re-asking until the answer is within bounds. An empty answer
//! takes the default shown in brackets.

use std::io::{BufRead, Write};

use clap::Args;
use tracing::info;

use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::PassengerRecord;
use crate::inference::{Predictor, Verdict};
use crate::training::domain::ModelArtifact;

pub fn parse_pclass(s: &str) -> Result<u8, String> {
    match s.trim().parse::<u8>() {
        Ok(v @ 1..=3) => Ok(v),
        _ => Err(format!("'{s}' is not a ticket class (1, 2 or 3)")),
    }
}

pub fn parse_sex(s: &str) -> Result<String, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        v @ ("male" | "female") => Ok(v.to_string()),
        _ => Err(format!("'{s}' is not one of male, female")),
    }
}

pub fn parse_port(s: &str) -> Result<String, String> {
    match s.trim().to_ascii_uppercase().as_str() {
        v @ ("S" | "C" | "Q") => Ok(v.to_string()),
        _ => Err(format!("'{s}' is not one of S, C, Q")),
    }
}

const MAX_AGE: f64 = 100.0;
const MAX_FARE: f64 = 500.0;
const MAX_RELATIVES: u32 = 10;

/// NaN and infinities fall outside every range.
fn check_f64(v: f64, what: &str, max: f64) -> Result<f64, String> {
    if (0.0..=max).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{what} must be between 0 and {max}"))
    }
}

fn check_relatives(v: u32) -> Result<u32, String> {
    if v <= MAX_RELATIVES {
        Ok(v)
    } else {
        Err(format!("count must be between 0 and {MAX_RELATIVES}"))
    }
}

fn parse_bounded_f64(s: &str, what: &str, max: f64) -> Result<f64, String> {
    let v: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    check_f64(v, what, max)
}

pub fn parse_age(s: &str) -> Result<f64, String> {
    parse_bounded_f64(s, "age", MAX_AGE)
}

pub fn parse_fare(s: &str) -> Result<f64, String> {
    parse_bounded_f64(s, "fare", MAX_FARE)
}

pub fn parse_relatives(s: &str) -> Result<u32, String> {
    let v = s
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("'{s}' is not a valid count"))?;
    check_relatives(v)
}

/// Passenger fields for the `form` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct FormArgs {
    /// Ticket class (1 = 1st, 2 = 2nd, 3 = 3rd)
    #[arg(long, value_parser = parse_pclass)]
    pub pclass: Option<u8>,

    /// Gender (male, female)
    #[arg(long, value_parser = parse_sex)]
    pub sex: Option<String>,

    /// Age in years (0-100)
    #[arg(long, value_parser = parse_age)]
    pub age: Option<f64>,

    /// Siblings/spouses aboard (0-10)
    #[arg(long, value_parser = parse_relatives)]
    pub sibsp: Option<u32>,

    /// Parents/children aboard (0-10)
    #[arg(long, value_parser = parse_relatives)]
    pub parch: Option<u32>,

    /// Fare paid (0-500)
    #[arg(long, value_parser = parse_fare)]
    pub fare: Option<f64>,

    /// Port of embarkation (S, C, Q)
    #[arg(long, value_parser = parse_port)]
    pub embarked: Option<String>,

    /// Full name in "Surname, Title. Given" form; enables title features
    #[arg(long)]
    pub name: Option<String>,

    /// Fail instead of prompting for fields not given as flags
    #[arg(long)]
    pub no_prompt: bool,
}

/// A complete, validated form submission.
#[derive(Clone, Debug, PartialEq)]
pub struct FormInput {
    pub pclass: u8,
    pub sex: String,
    pub age: f64,
    pub sibsp: u32,
    pub parch: u32,
    pub fare: f64,
    pub embarked: String,
    pub name: Option<String>,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            pclass: 1,
            sex: "male".to_string(),
            age: 30.0,
            sibsp: 0,
            parch: 0,
            fare: 32.0,
            embarked: "S".to_string(),
            name: None,
        }
    }
}

impl FormInput {
    /// Check every field against its bounds.
    pub fn validate(&self) -> TitanicResult<()> {
        let pclass = if (1..=3).contains(&self.pclass) {
            Ok(())
        } else {
            Err(format!("{} is not a ticket class (1, 2 or 3)", self.pclass))
        };
        let checks = [
            pclass,
            parse_sex(&self.sex).map(drop),
            check_f64(self.age, "age", MAX_AGE).map(drop),
            check_relatives(self.sibsp).map(drop),
            check_relatives(self.parch).map(drop),
            check_f64(self.fare, "fare", MAX_FARE).map(drop),
            parse_port(&self.embarked).map(drop),
        ];
        for check in checks {
            check.map_err(TitanicError::InvalidInput)?;
        }
        Ok(())
    }

    pub fn to_record(&self) -> PassengerRecord {
        PassengerRecord {
            pclass: self.pclass,
            name: self.name.clone(),
            sex: self.sex.clone(),
            age: Some(self.age),
            sibsp: self.sibsp,
            parch: self.parch,
            fare: Some(self.fare),
            embarked: Some(self.embarked.clone()),
            ..PassengerRecord::default()
        }
    }

    /// Fill every field: flags first, then prompts for the rest.
    pub fn collect<R: BufRead, W: Write>(
        args: &FormArgs,
        input: &mut R,
        output: &mut W,
    ) -> TitanicResult<Self> {
        let d = Self::default();
        let mut prompt = Prompt {
            input,
            output,
            enabled: !args.no_prompt,
        };

        let form = Self {
            pclass: prompt.field(args.pclass, "Ticket class (1/2/3)", d.pclass, parse_pclass)?,
            sex: prompt.field(args.sex.clone(), "Gender (male/female)", d.sex, parse_sex)?,
            age: prompt.field(args.age, "Age (0-100)", d.age, parse_age)?,
            sibsp: prompt.field(args.sibsp, "Siblings/spouses aboard (0-10)", d.sibsp, parse_relatives)?,
            parch: prompt.field(args.parch, "Parents/children aboard (0-10)", d.parch, parse_relatives)?,
            fare: prompt.field(args.fare, "Fare paid (0-500)", d.fare, parse_fare)?,
            embarked: prompt.field(args.embarked.clone(), "Port of embarkation (S/C/Q)", d.embarked, parse_port)?,
            name: args.name.clone(),
        };
        form.validate()?;
        Ok(form)
    }
}

struct Prompt<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
    enabled: bool,
}

impl<R: BufRead, W: Write> Prompt<'_, R, W> {
    fn field<T: ToString>(
        &mut self,
        given: Option<T>,
        label: &str,
        default: T,
        parse: fn(&str) -> Result<T, String>,
    ) -> TitanicResult<T> {
        if let Some(value) = given {
            return Ok(value);
        }
        if !self.enabled {
            return Err(TitanicError::invalid(format!("missing form field: {label}")));
        }

        let default_text = default.to_string();
        loop {
            write!(self.output, "{label} [{default_text}]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(TitanicError::invalid("input ended before the form was complete"));
            }
            let answer = line.trim();
            if answer.is_empty() {
                return parse(&default_text).map_err(TitanicError::InvalidInput);
            }
            match parse(answer) {
                Ok(value) => return Ok(value),
                Err(msg) => writeln!(self.output, "  {msg}, try again")?,
            }
        }
    }
}

/// Predict for one passenger with an already-loaded model.
pub fn predict_form(artifact: &ModelArtifact, form: &FormInput) -> TitanicResult<Verdict> {
    form.validate()?;
    let verdict = Predictor::new(artifact).predict_record(&form.to_record())?;
    info!(
        pclass = form.pclass,
        sex = %form.sex,
        survived = verdict.survived,
        probability = format_args!("{:.2}", verdict.probability),
        "form prediction"
    );
    Ok(verdict)
}
