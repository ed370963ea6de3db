use crate::error::SessionError;

/// Wallet connection owned by the host application.
///
/// The gate only reads sign-in state and asks for the login prompt; how an
/// account actually signs in is up to the implementation.
pub trait WalletSession {
    fn account_id(&self) -> Option<&str>;

    fn is_signed_in(&self) -> bool;

    fn show_login_prompt(&mut self);

    fn sign_out(&mut self) -> impl Future<Output = Result<(), SessionError>>;
}

/// The account that gated actions act on, if the session is fully signed in.
pub fn signed_in_account<S: WalletSession>(session: &S) -> Option<&str> {
    if session.is_signed_in() {
        session.account_id()
    } else {
        None
    }
}
