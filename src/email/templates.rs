use crate::i18n::Locale;

/// A rendered mail with plain-text and HTML alternatives.
#[derive(Debug)]
pub struct RenderedMail {
    pub subject: &'static str,
    pub text: String,
    pub html: String,
}

struct ResetCopy {
    subject: &'static str,
    heading: &'static str,
    greeting: &'static str,
    intro: &'static str,
    button: &'static str,
    footer: &'static str,
}

fn reset_copy(locale: Locale) -> ResetCopy {
    match locale {
        Locale::En => ResetCopy {
            subject: "Reset your password",
            heading: "Password Reset",
            greeting: "Hi",
            intro: "A password reset was requested for your dashboard account.",
            button: "Reset Password",
            footer: "This link expires in 1 hour. If you didn't request this, you can ignore it.",
        },
        Locale::Id => ResetCopy {
            subject: "Atur ulang kata sandi Anda",
            heading: "Atur Ulang Kata Sandi",
            greeting: "Halo",
            intro: "Permintaan atur ulang kata sandi diterima untuk akun dashboard Anda.",
            button: "Atur Ulang Kata Sandi",
            footer: "Tautan ini berlaku selama 1 jam. Abaikan email ini jika Anda tidak memintanya.",
        },
    }
}

pub fn render_password_reset(name: &str, reset_url: &str, locale: Locale) -> RenderedMail {
    let copy = reset_copy(locale);

    let text = format!(
        "{greeting} {name},\n\n{intro}\n\n{button}: {reset_url}\n\n{footer}\n",
        greeting = copy.greeting,
        intro = copy.intro,
        button = copy.button,
        footer = copy.footer,
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>{heading}</h2>
    <p>{greeting} {name},</p>
    <p>{intro}</p>
    <p><a href="{reset_url}" style="display: inline-block; padding: 10px 20px; background: #667eea; color: white; text-decoration: none; border-radius: 4px;">{button}</a></p>
    <p style="color: #666; font-size: 14px;">{footer}</p>
</body>
</html>"#,
        heading = copy.heading,
        greeting = copy.greeting,
        name = escape(name),
        intro = copy.intro,
        reset_url = escape(reset_url),
        button = copy.button,
        footer = copy.footer,
    );

    RenderedMail {
        subject: copy.subject,
        text,
        html,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
