// HTML pages
// Plain server-rendered forms; the browser's <audio> element plays the clips
use std::fmt::Write;
use uuid::Uuid;

use crate::config::DesignConfig;
use crate::render::TransformParams;
use crate::trial::validate::{rank_field, CHOICE_FIELD, OPT_OUT_FIELD};
use crate::trial::{Participant, ResponseMode, Trial};

const STYLE: &str = "body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem;line-height:1.5}\
.warning{background:#fff3cd;border:1px solid #e0c36a;padding:.5rem 1rem}\
.error{background:#f8d7da;border:1px solid #d9868f;padding:.5rem 1rem}\
.stimulus{border:1px solid #ccc;border-radius:6px;padding:.5rem 1rem;margin:1rem 0}\
.params{color:#555;font-size:.9rem}";

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn notice(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!("<p class=\"{}\">{}</p>\n", class, escape(m)))
        .unwrap_or_default()
}

pub fn register_form(title: &str, session: &Uuid, warning: Option<&str>) -> String {
    let body = format!(
        "<p>Please enter the following information. An ID is assigned automatically once you register.</p>\n\
         {warning}\
         <form method=\"post\" action=\"/s/{session}/register\">\n\
         <fieldset><legend>Gender</legend>\n\
         <label><input type=\"radio\" name=\"gender\" value=\"male\" checked> Male</label>\n\
         <label><input type=\"radio\" name=\"gender\" value=\"female\"> Female</label>\n\
         </fieldset>\n\
         <p><label>Age (numbers only) <input type=\"text\" name=\"age\" inputmode=\"numeric\" required></label></p>\n\
         <p><button type=\"submit\">Register</button></p>\n\
         </form>",
        warning = notice("warning", warning),
        session = session,
    );
    layout(title, &body)
}

pub fn already_registered(title: &str, session: &Uuid, participant: &Participant) -> String {
    let body = format!(
        "<p>Registration complete (participant {}). Continue to the experiment below.</p>\n\
         <p><a href=\"/s/{}/trial\">Go to the experiment</a></p>",
        participant.id, session
    );
    layout(title, &body)
}

fn describe_params(params: &TransformParams) -> String {
    let mut parts = Vec::new();
    if params.tempo_ratio != 1.0 {
        parts.push(format!("tempo x{}", params.tempo_ratio));
    }
    if params.semitones != 0 {
        parts.push(format!("pitch {:+} st", params.semitones));
    }
    if !params.eq.is_flat() {
        parts.push(format!(
            "EQ {:+}/{:+}/{:+} dB",
            params.eq.low_db, params.eq.mid_db, params.eq.high_db
        ));
    }
    if parts.is_empty() {
        "unmodified".to_string()
    } else {
        parts.join(", ")
    }
}

fn stimulus_label(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn rank_select(name: &str, label: &str, options: usize) -> String {
    let mut html = format!("<p><label>{} <select name=\"{}\" required>\n<option value=\"\">-</option>\n", escape(label), name);
    for rank in 1..=options {
        let _ = writeln!(html, "<option value=\"{0}\">{0}</option>", rank);
    }
    html.push_str("</select></label></p>\n");
    html
}

pub fn trial_page(
    title: &str,
    session: &Uuid,
    design: &DesignConfig,
    trial: &Trial,
    error: Option<&str>,
) -> String {
    let mut body = format!(
        "<h2>Trial {}/{}</h2>\n{}",
        trial.number,
        design.trials_per_participant,
        notice("error", error)
    );

    for (index, stimulus) in trial.stimuli.iter().enumerate() {
        let _ = write!(
            body,
            "<div class=\"stimulus\">\n<h3>Clip {label}</h3>\n\
             <audio controls preload=\"auto\" src=\"/clips/{file}\"></audio>\n\
             <p>Price: {price}</p>\n",
            label = stimulus_label(index),
            file = escape(&stimulus.clip_file),
            price = stimulus.price,
        );
        if design.show_parameters {
            let _ = write!(
                body,
                "<p class=\"params\">{}<br>{}</p>\n",
                escape(&stimulus.source.describe()),
                escape(&describe_params(&stimulus.params))
            );
        }
        body.push_str("</div>\n");
    }

    let _ = write!(body, "<form method=\"post\" action=\"/s/{}/trial\">\n", session);
    match design.response {
        ResponseMode::Rank => {
            let options = trial.stimuli.len() + 1;
            body.push_str("<p>Rank the options (1 = most preferred). Each rank may be used once.</p>\n");
            for index in 0..trial.stimuli.len() {
                let label = format!("Buy clip {}", stimulus_label(index));
                body.push_str(&rank_select(&rank_field(index), &label, options));
            }
            body.push_str(&rank_select(OPT_OUT_FIELD, "Buy none", options));
        }
        ResponseMode::Choice => {
            body.push_str("<fieldset><legend>Which clip do you prefer?</legend>\n");
            for index in 0..trial.stimuli.len() {
                let _ = writeln!(
                    body,
                    "<label><input type=\"radio\" name=\"{}\" value=\"{}\" required> Clip {}</label>",
                    CHOICE_FIELD,
                    index,
                    stimulus_label(index)
                );
            }
            body.push_str("</fieldset>\n");
        }
    }
    body.push_str("<p><button type=\"submit\">Submit</button></p>\n</form>");

    layout(title, &body)
}

pub fn done_page(title: &str, participant: Option<&Participant>, trials: u32) -> String {
    let who = participant
        .map(|p| format!(" Participant {}:", p.id))
        .unwrap_or_default();
    let body = format!(
        "<p>All trials are complete.{} {} answers were recorded. Thank you for taking part!</p>",
        who, trials
    );
    layout(title, &body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "{}<p><a href=\"/\">Start over</a></p>",
        notice("error", Some(message))
    );
    layout(title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::StimulusSource;
    use crate::render::EqGains;
    use crate::trial::Stimulus;
    use chrono::Utc;
    use std::path::PathBuf;

    fn trial() -> Trial {
        let stimulus = |file: &str, tempo: f32| Stimulus {
            source: StimulusSource::File {
                path: PathBuf::from(format!("/d/{}", file)),
            },
            params: TransformParams {
                tempo_ratio: tempo,
                semitones: 2,
                eq: EqGains::default(),
            },
            price: 50,
            clip_file: format!("{}-clip.wav", file),
        };
        Trial {
            number: 2,
            stimuli: vec![stimulus("a.wav", 1.2), stimulus("b.wav", 0.8)],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"Tom & Jerry's\"</b>"), "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_register_form_warning() {
        let id = Uuid::new_v4();
        let html = register_form("Survey", &id, Some("please enter your age as a number"));
        assert!(html.contains(&format!("action=\"/s/{}/register\"", id)));
        assert!(html.contains("class=\"warning\""));

        let clean = register_form("Survey", &id, None);
        assert!(!clean.contains("class=\"warning\""));
    }

    #[test]
    fn test_rank_trial_page() {
        let id = Uuid::new_v4();
        let html = trial_page("Survey", &id, &DesignConfig::default(), &trial(), None);

        assert!(html.contains("Trial 2/10"));
        assert!(html.contains("src=\"/clips/a.wav-clip.wav\""));
        assert!(html.contains("name=\"rank_0\""));
        assert!(html.contains("name=\"rank_1\""));
        assert!(html.contains("name=\"rank_none\""));
        assert!(html.contains("<option value=\"3\">3</option>"));
        assert!(html.contains("tempo x1.2, pitch +2 st"));
        assert!(html.contains("Price: 50"));
    }

    #[test]
    fn test_choice_page_hides_parameters() {
        let design = DesignConfig {
            response: ResponseMode::Choice,
            show_parameters: false,
            ..DesignConfig::default()
        };
        let html = trial_page("Survey", &Uuid::new_v4(), &design, &trial(), Some("ranks must not repeat"));

        assert!(html.contains("name=\"choice\" value=\"1\""));
        assert!(!html.contains("rank_none"));
        assert!(!html.contains("tempo x"));
        assert!(html.contains("ranks must not repeat"));
    }

    #[test]
    fn test_unmodified_params() {
        assert_eq!(describe_params(&TransformParams::default()), "unmodified");
    }
}
