use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::contracts::Model;

/// The caller must be the client or the freelancer on the contract (admins may read).
pub fn ensure_can_view(contract: &Model, principal: &Principal) -> Result<(), AppError> {
    if contract.is_party(principal.id) || principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only view contracts you are involved in".to_string(),
        ))
    }
}

/// The caller must be the freelancer on the contract.
pub fn ensure_freelancer(contract: &Model, principal: &Principal) -> Result<(), AppError> {
    if contract.freelancer_id == principal.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the freelancer on this contract can do this".to_string(),
        ))
    }
}

/// The caller must be a party; returns the other party.
pub fn counterparty_of(contract: &Model, principal: &Principal) -> Result<uuid::Uuid, AppError> {
    contract.counterparty(principal.id).ok_or_else(|| {
        AppError::Forbidden("You are not a party to this contract".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contracts::Status;
    use crate::models::users::Roles;
    use uuid::Uuid;

    fn contract(client_id: Uuid, freelancer_id: Uuid) -> Model {
        Model {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            client_id,
            freelancer_id,
            status: Status::Pending,
            start_date: None,
            end_date: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        }
    }

    fn principal(id: Uuid, role: Roles) -> Principal {
        Principal { id, role }
    }

    #[test]
    fn counterparty_is_the_other_side() {
        let (client, freelancer) = (Uuid::new_v4(), Uuid::new_v4());
        let c = contract(client, freelancer);

        assert_eq!(
            counterparty_of(&c, &principal(client, Roles::Client)).unwrap(),
            freelancer
        );
        assert_eq!(
            counterparty_of(&c, &principal(freelancer, Roles::Freelancer)).unwrap(),
            client
        );
        assert!(counterparty_of(&c, &principal(Uuid::new_v4(), Roles::Client)).is_err());
    }

    #[test]
    fn admins_can_view_but_not_act_as_freelancer() {
        let c = contract(Uuid::new_v4(), Uuid::new_v4());
        let admin = principal(Uuid::new_v4(), Roles::Admin);

        assert!(ensure_can_view(&c, &admin).is_ok());
        assert!(matches!(
            ensure_freelancer(&c, &admin),
            Err(AppError::Forbidden(_))
        ));
    }
}
