use clap::Args;
use whitelist_relay::client::form::{AGREE_FIELD, TOKEN_FIELD};
use whitelist_relay::client::{FormController, FormState, HttpApplyTransport};
use whitelist_relay::error::AppError;
use whitelist_relay::relay::outbound_client;

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// Base URL of the relay (e.g. http://127.0.0.1:3000)
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub(crate) relay_url: String,
    /// Minecraft username
    #[arg(long)]
    pub(crate) minecraft: String,
    /// Anti-bot token issued by the challenge widget
    #[arg(long)]
    pub(crate) token: String,
    #[arg(long)]
    pub(crate) email: Option<String>,
    #[arg(long)]
    pub(crate) discord: Option<String>,
    #[arg(long)]
    pub(crate) reddit: Option<String>,
    #[arg(long)]
    pub(crate) notify_email: Option<String>,
    /// How the applicant found the server
    #[arg(long)]
    pub(crate) found_via: Option<String>,
    /// Tick the terms-of-service box
    #[arg(long)]
    pub(crate) agree: bool,
}

pub(crate) async fn run_apply(args: ApplyArgs) -> Result<(), AppError> {
    let ApplyArgs {
        relay_url,
        minecraft,
        token,
        email,
        discord,
        reddit,
        notify_email,
        found_via,
        agree,
    } = args;

    let transport = HttpApplyTransport::new(outbound_client(None)?, relay_url);
    let mut controller = FormController::new(transport).requiring_agreement();

    let form = controller.form_mut();
    form.set("minecraft", minecraft).set(TOKEN_FIELD, token);
    let optional = [
        ("email", email),
        ("discord", discord),
        ("reddit", reddit),
        ("notifyEmail", notify_email),
        ("foundVia", found_via),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            form.set(name, value);
        }
    }
    if agree {
        form.set(AGREE_FIELD, "on");
    }

    match controller.submit().await {
        FormState::Success(message) => {
            println!("{message}");
            Ok(())
        }
        FormState::Error(message) => Err(AppError::Submission(message.clone())),
        FormState::Idle | FormState::Submitting => Ok(()),
    }
}
