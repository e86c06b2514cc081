use super::sendmail::{send_email, MailError};
use crate::config::Config;

const EVENT_TEMPLATE: &str = r#"
<html>
  <body style="font-family: sans-serif; color: #222;">
    <h2>{{headline}}</h2>
    <p>Hi {{name}},</p>
    <p>{{detail}}</p>
    <p>Open your StayCollab dashboard to review and respond.</p>
    <p>— The StayCollab team</p>
  </body>
</html>
"#;

/// Send a lifecycle-event email. Every placeholder is filled here so the
/// template never leaks `{{...}}` markers.
pub async fn send_event_email(
    config: &Config,
    to_email: &str,
    name: &str,
    subject: &str,
    headline: &str,
    detail: &str,
) -> Result<(), MailError> {
    let html = EVENT_TEMPLATE
        .replace("{{headline}}", headline)
        .replace("{{name}}", name)
        .replace("{{detail}}", detail);

    send_email(config, to_email, subject, &html).await
}
