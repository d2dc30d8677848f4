//! Server-side HTML for the upload UI.

use crate::models::Prediction;

const STYLE: &str = include_str!("../static/style.css");

pub const GENERIC_ERROR: &str = "❌ Error: Unable to process the image. Please try again.";

/// The image the user just uploaded, shown above the result.
pub struct Preview<'a> {
    pub file_name: &'a str,
    /// `data:` URI of the uploaded bytes
    pub data_uri: String,
}

/// What happened to an upload.
pub enum Outcome<'a> {
    Predicted(&'a Prediction),
    Failed(String),
}

/// Escape text for use in element content and quoted attributes.
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

/// `0.12345` -> `12.35%`
pub fn percent(probability: f32) -> String {
    format!("{:.2}%", probability * 100.0)
}

pub fn index_page() -> String {
    page("")
}

pub fn result_page(preview: Option<&Preview>, outcome: &Outcome) -> String {
    let mut body = String::new();

    if let Some(preview) = preview {
        body.push_str(&format!(
            r#"<div class="image-container"><img src="{src}" alt="{name}"><span class="caption">Uploaded Potato Leaf: {name}</span></div>"#,
            src = escape(&preview.data_uri),
            name = escape(preview.file_name),
        ));
        body.push_str("<p>🔍 Analyzing the image...</p>");
    }

    match outcome {
        Outcome::Predicted(prediction) => body.push_str(&prediction_html(prediction)),
        Outcome::Failed(message) => {
            body.push_str(&format!(
                r#"<div class="error-box">{}</div>"#,
                escape(message)
            ));
        }
    }

    page(&body)
}

fn prediction_html(prediction: &Prediction) -> String {
    let mut html = format!(
        r#"<div class="result-box"><h3>Detection Result</h3><p><strong>Predicted Disease:</strong> {}</p><p><strong>Confidence:</strong> {}</p></div>"#,
        escape(&prediction.class),
        percent(prediction.confidence),
    );

    html.push_str(r#"<div class="probabilities"><h4>Class Probabilities:</h4>"#);
    for (label, probability) in prediction.ranked() {
        html.push_str(&format!(
            r#"<div class="probability"><p><strong>{}:</strong> {}</p><progress max="1" value="{:.4}"></progress></div>"#,
            escape(label),
            percent(probability),
            probability.clamp(0.0, 1.0),
        ));
    }
    html.push_str("</div>");
    html
}

fn page(result: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Potato Disease Detection</title>
<style>
{style}
</style>
</head>
<body>
<div class="main-container">
<h1>🥔 Potato Disease Detection</h1>
<p class="subtitle">Upload a potato leaf image to detect diseases like Early Blight and Late Blight</p>
<div class="upload-box">
<h3>Upload Potato Leaf Image</h3>
<form action="/analyze" method="post" enctype="multipart/form-data">
<label for="file">Choose an image file</label>
<input id="file" type="file" name="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required>
<button type="submit">Detect Disease</button>
</form>
</div>
{result}
<div class="footer">
<p style="margin-bottom: 10px;">This application helps detect common potato plant diseases using AI</p>
<p>Supported diseases: Early Blight, Late Blight, and Healthy plants</p>
</div>
</div>
</body>
</html>
"#,
        style = STYLE,
        result = result,
    )
}
