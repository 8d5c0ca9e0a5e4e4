#[cfg(test)]
mod common;

#[cfg(test)]
mod auth_tests;

#[cfg(test)]
mod case_tests;

#[cfg(test)]
mod ledger_tests;

#[cfg(test)]
mod taxonomy_tests;

#[cfg(test)]
mod detention_tests;

#[cfg(test)]
mod quotation_tests;

#[cfg(test)]
mod message_tests;

#[cfg(test)]
mod inquiry_tests;

#[cfg(test)]
mod misc_tests;

#[cfg(test)]
mod rate_limit_tests;
