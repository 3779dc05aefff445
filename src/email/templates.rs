/// Text and HTML bodies for the artwork-rejection notification.
pub fn render_rejection(name: &str, art_title: &str) -> (String, String) {
    let text = format!(
        "Hi {name},\n\n\
         Thank you for submitting \"{art_title}\" to Atelier. After review, \
         our moderators were unable to accept it this season.\n\n\
         The uploaded files have been removed. You're welcome to submit \
         new work in any open season.\n\n\
         — The Atelier team\n"
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Your submission was not accepted</h2>
    <p>Hi {name},</p>
    <p>Thank you for submitting <strong>{art_title}</strong> to Atelier. After review, our moderators were unable to accept it this season.</p>
    <p>The uploaded files have been removed. You're welcome to submit new work in any open season.</p>
    <p style="color: #666; font-size: 14px;">— The Atelier team</p>
</body>
</html>"#
    );

    (text, html)
}
