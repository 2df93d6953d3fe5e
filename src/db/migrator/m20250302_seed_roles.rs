use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Query;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Built-in roles.
const ROLE_ORG_OWNER: &str = "org_owner";
const ROLE_MEMBER: &str = "member";

/// Platform resources permissions are declared over.
const RESOURCES: [&str; 6] = [
    "games",
    "game_keys",
    "pricing",
    "analytics",
    "members",
    "settings",
];

const ACTIONS: [&str; 4] = ["read", "create", "update", "delete"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        use crate::entities::{permissions, role_permissions, roles};

        for (name, description) in [
            (ROLE_ORG_OWNER, "Organization owner with full access"),
            (ROLE_MEMBER, "Organization member with read access"),
        ] {
            let insert = Query::insert()
                .into_table(Roles)
                .columns([roles::Column::Name, roles::Column::Description])
                .values_panic([name.into(), description.into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        let mut permission_id: i32 = 0;
        let mut member_permission_ids = Vec::new();
        let mut owner_permission_ids = Vec::new();

        for resource in RESOURCES {
            for action in ACTIONS {
                let insert = Query::insert()
                    .into_table(Permissions)
                    .columns([
                        permissions::Column::Resource,
                        permissions::Column::Action,
                        permissions::Column::Description,
                    ])
                    .values_panic([
                        resource.into(),
                        action.into(),
                        format!("{action} access to {resource}").into(),
                    ])
                    .to_owned();
                manager.exec_stmt(insert).await?;

                permission_id += 1;
                owner_permission_ids.push(permission_id);
                if action == "read" {
                    member_permission_ids.push(permission_id);
                }
            }
        }

        // Role ids follow insertion order above: org_owner = 1, member = 2
        for pid in owner_permission_ids {
            let insert = Query::insert()
                .into_table(RolePermissions)
                .columns([
                    role_permissions::Column::RoleId,
                    role_permissions::Column::PermissionId,
                ])
                .values_panic([1.into(), pid.into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        for pid in member_permission_ids {
            let insert = Query::insert()
                .into_table(RolePermissions)
                .columns([
                    role_permissions::Column::RoleId,
                    role_permissions::Column::PermissionId,
                ])
                .values_panic([2.into(), pid.into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(RolePermissions).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Permissions).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Roles).to_owned())
            .await?;

        Ok(())
    }
}
