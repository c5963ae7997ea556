pub type Endpoint = str;

pub const LOGIN: &Endpoint = "/login";
pub const ACCOUNTS: &Endpoint = "/accounts";
pub const ACCOUNT_DETAILS: &Endpoint = "/accounts-details/?full=N&_pjax=%23pjax-account-details";
pub const HOME: &Endpoint = "/";
