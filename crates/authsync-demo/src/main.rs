//! authsync-demo - drives the session manager against the in-memory
//! identity provider and prints what the navigation bar would show after
//! every step.

use authsync_core::consumers::{AuthSection, NavbarModel, Route};
use authsync_core::provider::MemoryIdentityProvider;
use authsync_core::{AuthContext, AuthError, Identity, ProfileUpdate, ProviderKind};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Register, update the profile, sign out, fail a sign-in, sign back in.
    Basic,
    /// Google sign-in and sign-out racing; the last notification wins.
    Race,
}

#[derive(Parser, Debug)]
#[command(name = "authsync-demo", about = "Walk through client-side auth session flows")]
struct Args {
    #[arg(long, value_enum, default_value_t = Scenario::Basic)]
    scenario: Scenario,

    /// Write a session transition log into this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long, default_value = "ada@example.com")]
    email: String,

    #[arg(long, default_value = "correct-horse")]
    password: String,
}

fn google_identity() -> Identity {
    Identity::new("google-1815")
        .with_email("ada.lovelace@gmail.com")
        .with_display_name("Ada Lovelace")
}

fn build_context(provider: Arc<MemoryIdentityProvider>, log_dir: Option<&PathBuf>) -> AuthContext {
    let builder = AuthContext::builder(provider);
    match log_dir {
        Some(dir) => builder.log_dir(dir).build(),
        None => builder.build(),
    }
}

fn report(step: &str, ctx: &AuthContext, navbar: &NavbarModel) {
    let session = ctx.session();
    let section = match navbar.section() {
        AuthSection::Pending => "…".to_string(),
        AuthSection::SignedOut { login, register } => format!("[Login {login}] [Register {register}]"),
        AuthSection::SignedIn(badge) => format!(
            "{} <{}> [Logout]",
            badge.name,
            badge.email.as_deref().unwrap_or("no email")
        ),
    };
    println!(
        "{:<32} phase={:<16} navbar={} profile-guard={:?}",
        step,
        format!("{:?}", session.phase()),
        section,
        ctx.guard(Route::Profile)
    );
}

async fn run_basic(args: &Args) -> Result<(), AuthError> {
    let provider = Arc::new(
        MemoryIdentityProvider::new().with_popup_account(ProviderKind::Google, google_identity()),
    );
    let ctx = build_context(Arc::clone(&provider), args.log_dir.as_ref());
    let navbar = ctx.navbar();
    let manager = &ctx.manager;
    report("startup", &ctx, &navbar);

    manager
        .register_with_email_password(&args.email, &args.password)
        .await?;
    report("register", &ctx, &navbar);

    manager
        .update_profile(ProfileUpdate::default().display_name("Ada"))
        .await?;
    report("update profile", &ctx, &navbar);

    manager.sign_out().await?;
    report("sign out", &ctx, &navbar);

    match manager
        .sign_in_with_email_password(&args.email, "not-the-password")
        .await
    {
        Ok(()) => log::warn!("Sign-in with a wrong password unexpectedly succeeded"),
        Err(e) => println!("rejected: {e}"),
    }
    report("sign in (wrong password)", &ctx, &navbar);

    manager
        .sign_in_with_email_password(&args.email, &args.password)
        .await?;
    report("sign in", &ctx, &navbar);

    // Another tab signs the user out behind our back.
    provider.emit(None);
    report("external sign out", &ctx, &navbar);

    manager.sign_in_with_google().await?;
    report("sign in with google", &ctx, &navbar);

    println!("renders: {}", navbar.render_count());
    Ok(())
}

async fn run_race(args: &Args) -> Result<(), AuthError> {
    let provider = Arc::new(
        MemoryIdentityProvider::manual().with_popup_account(ProviderKind::Google, google_identity()),
    );
    let ctx = build_context(Arc::clone(&provider), args.log_dir.as_ref());
    let navbar = ctx.navbar();
    let mut events = ctx.event_bus.subscribe();
    report("startup", &ctx, &navbar);

    provider.emit(None);
    report("first notification", &ctx, &navbar);

    let (sign_in, sign_out) = tokio::join!(ctx.manager.sign_in_with_google(), ctx.manager.sign_out());
    sign_in?;
    sign_out?;
    report("both calls resolved", &ctx, &navbar);

    // The provider settles sign-out first, then reports the sign-in.
    provider.emit(None);
    report("notified: signed out", &ctx, &navbar);
    provider.emit(Some(google_identity()));
    report("notified: signed in", &ctx, &navbar);

    while let Ok(event) = events.try_recv() {
        log::debug!("event: {:?}", event);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AuthError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Running {:?} scenario", args.scenario);

    match args.scenario {
        Scenario::Basic => run_basic(&args).await,
        Scenario::Race => run_race(&args).await,
    }
}
